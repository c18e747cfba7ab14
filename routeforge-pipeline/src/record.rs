//! Records flowing between stages and the declared shape of each stage.

use std::fmt;

use routeforge_core::{Feature, OsmEntity};

/// A value passed from one stage to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// An OSM node, way or relation.
    Entity(OsmEntity),
    /// A geo feature.
    Feature(Feature),
}

impl Record {
    /// Kind tag of this record.
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Entity(_) => RecordKind::Entity,
            Self::Feature(_) => RecordKind::Feature,
        }
    }
}

impl From<OsmEntity> for Record {
    fn from(entity: OsmEntity) -> Self {
        Self::Entity(entity)
    }
}

impl From<Feature> for Record {
    fn from(feature: Feature) -> Self {
        Self::Feature(feature)
    }
}

/// Kind tag used to check adjacent stages without running them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// [`Record::Entity`].
    Entity,
    /// [`Record::Feature`].
    Feature,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entity => "entity",
            Self::Feature => "feature",
        })
    }
}

/// Position a stage may take in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRole {
    /// Produces records; must come first.
    Source,
    /// Maps or filters records; must sit between source and target.
    Transform,
    /// Consumes records; must come last.
    Target,
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Transform => "transform",
            Self::Target => "target",
        })
    }
}

/// Declared role and record kinds of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageShape {
    /// Where the stage may appear.
    pub role: StageRole,
    /// Kind consumed, `None` for sources.
    pub input: Option<RecordKind>,
    /// Kind produced, `None` for targets.
    pub output: Option<RecordKind>,
}

impl StageShape {
    /// A source producing `output`.
    pub const fn source(output: RecordKind) -> Self {
        Self {
            role: StageRole::Source,
            input: None,
            output: Some(output),
        }
    }

    /// A transform from `input` to `output`.
    pub const fn transform(input: RecordKind, output: RecordKind) -> Self {
        Self {
            role: StageRole::Transform,
            input: Some(input),
            output: Some(output),
        }
    }

    /// A target consuming `input`.
    pub const fn target(input: RecordKind) -> Self {
        Self {
            role: StageRole::Target,
            input: Some(input),
            output: None,
        }
    }
}
