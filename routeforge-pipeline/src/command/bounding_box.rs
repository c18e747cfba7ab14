use std::fmt;

use geo::{Rect, coord};

use super::{CommandArgs, StageCommand};
use crate::error::{CompileError, ResourceError};
use crate::processor::{BoundingBoxFilter, Processor};
use crate::record::{RecordKind, StageShape};

/// Keep entities inside a longitude/latitude box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western edge in degrees.
    pub left: f64,
    /// Southern edge in degrees.
    pub bottom: f64,
    /// Eastern edge in degrees.
    pub right: f64,
    /// Northern edge in degrees.
    pub top: f64,
}

impl BoundingBox {
    /// The box as a geometry.
    pub fn rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.left, y: self.bottom },
            coord! { x: self.right, y: self.top },
        )
    }
}

fn degrees(args: &mut CommandArgs<'_>, key: &str, limit: f64) -> Result<f64, CompileError> {
    let raw = args.require_value(key)?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| args.error(format!("`{key}={raw}` is not a number")))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(args.error(format!(
            "`{key}={raw}` must lie within ±{limit} degrees"
        )));
    }
    Ok(value)
}

impl StageCommand for BoundingBox {
    const SWITCHES: &'static [&'static str] = &["--bb", "--bounding-box"];
    const SUMMARY: &'static str = "keep entities inside a bounding box";
    const SHAPE: StageShape = StageShape::transform(RecordKind::Entity, RecordKind::Entity);

    fn parse(mut args: CommandArgs<'_>) -> Result<Self, CompileError> {
        let left = degrees(&mut args, "left", 180.0)?;
        let bottom = degrees(&mut args, "bottom", 90.0)?;
        let right = degrees(&mut args, "right", 180.0)?;
        let top = degrees(&mut args, "top", 90.0)?;
        if left >= right {
            return Err(args.error("`left` must be smaller than `right`"));
        }
        if bottom >= top {
            return Err(args.error("`bottom` must be smaller than `top`"));
        }
        args.finish()?;
        Ok(Self {
            left,
            bottom,
            right,
            top,
        })
    }

    fn open(self) -> Result<Processor, ResourceError> {
        Ok(Processor::Transform(Box::new(BoundingBoxFilter::new(
            self.rect(),
        ))))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} left={} bottom={} right={} top={}",
            Self::canonical_switch(),
            self.left,
            self.bottom,
            self.right,
            self.top
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(rest: &[&str]) -> Result<BoundingBox, CompileError> {
        BoundingBox::parse(CommandArgs::collect("--bb", rest)?)
    }

    #[test]
    fn parses_all_edges() {
        let command =
            parse(&["left=4.0", "bottom=50.0", "right=4.02", "top=50.02"]).expect("parse");
        assert_eq!(
            command,
            BoundingBox {
                left: 4.0,
                bottom: 50.0,
                right: 4.02,
                top: 50.02
            }
        );
        assert_eq!(
            command.to_string(),
            "--bounding-box left=4 bottom=50 right=4.02 top=50.02"
        );
    }

    #[rstest]
    #[case(&["left=4", "bottom=50", "right=5"], "top=")]
    #[case(&["left=5", "bottom=50", "right=4", "top=51"], "left")]
    #[case(&["left=4", "bottom=51", "right=5", "top=50"], "bottom")]
    #[case(&["left=east", "bottom=50", "right=5", "top=51"], "not a number")]
    #[case(&["left=4", "bottom=50", "right=5", "top=91"], "±90")]
    #[case(&["left=NaN", "bottom=50", "right=5", "top=51"], "±180")]
    fn rejects_invalid_boxes(#[case] rest: &[&str], #[case] named: &str) {
        let err = parse(rest).expect_err("invalid box");
        assert!(err.to_string().contains(named), "{err} should mention {named}");
    }
}
