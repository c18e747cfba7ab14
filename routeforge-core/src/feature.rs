//! Geo features derived from OSM entities.

use geo::Geometry;

use crate::{EntityKind, Tags};

/// A geometry with string properties, ready for export.
///
/// # Examples
/// ```
/// use geo::{Geometry, Point};
/// use routeforge_core::{EntityKind, Feature, Tags};
///
/// let feature = Feature::new(
///     EntityKind::Node,
///     12,
///     Geometry::Point(Point::new(4.35, 50.85)),
///     Tags::from([("amenity".into(), "cafe".into())]),
/// );
/// assert_eq!(feature.id, "node/12");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Stable identifier in `<kind>/<osm id>` form.
    pub id: String,
    /// Geometry in WGS84 (`x = longitude`, `y = latitude`).
    pub geometry: Geometry<f64>,
    /// Properties copied from the source entity's tags.
    pub properties: Tags,
}

impl Feature {
    /// Construct a feature for the given source entity.
    pub fn new(kind: EntityKind, osm_id: i64, geometry: Geometry<f64>, properties: Tags) -> Self {
        Self {
            id: format!("{kind}/{osm_id}"),
            geometry,
            properties,
        }
    }
}
