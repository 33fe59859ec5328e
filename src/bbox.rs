//! Axis-aligned bounding boxes in data coordinates.
//!
//! [`BoundingBox`] is always complete. [`PartialBox`] is what callers
//! request: any field may be pending until it is filled from a reference
//! extent with [`fill_missing`].

use serde::{Deserialize, Serialize};

use crate::error::{Axis, InsetError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Build a box, rejecting inverted or empty axes.
    pub fn checked(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self> {
        check_axis(Axis::X, xmin, xmax)?;
        check_axis(Axis::Y, ymin, ymax)?;
        Ok(Self::new(xmin, ymin, xmax, ymax))
    }

    pub fn x_range(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn y_range(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn merged(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    pub fn features(&self) -> Result<ExtentFeatures> {
        features(self)
    }
}

/// A requested box whose fields may still be pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialBox {
    pub xmin: Option<f64>,
    pub ymin: Option<f64>,
    pub xmax: Option<f64>,
    pub ymax: Option<f64>,
}

impl PartialBox {
    /// A box with every field pending.
    pub const fn pending() -> Self {
        Self {
            xmin: None,
            ymin: None,
            xmax: None,
            ymax: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.xmin.is_none() && self.ymin.is_none() && self.xmax.is_none() && self.ymax.is_none()
    }

    /// Check the ordering of every axis whose endpoints are both known.
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.xmin, self.xmax) {
            check_axis(Axis::X, min, max)?;
        }
        if let (Some(min), Some(max)) = (self.ymin, self.ymax) {
            check_axis(Axis::Y, min, max)?;
        }
        Ok(())
    }
}

impl From<BoundingBox> for PartialBox {
    fn from(b: BoundingBox) -> Self {
        Self {
            xmin: Some(b.xmin),
            ymin: Some(b.ymin),
            xmax: Some(b.xmax),
            ymax: Some(b.ymax),
        }
    }
}

/// Derived size quantities of a complete box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtentFeatures {
    pub x_range: f64,
    pub y_range: f64,
    pub aspect_ratio: f64,
}

/// Componentwise min/max over all boxes.
pub fn union(boxes: &[BoundingBox]) -> Result<BoundingBox> {
    let (first, rest) = boxes.split_first().ok_or(InsetError::EmptyInput)?;
    Ok(rest.iter().fold(*first, |acc, b| acc.merged(b)))
}

/// Substitute every pending field of `requested` from `reference`.
///
/// Known fields are kept as-is. The completed box must still be ordered on
/// both axes, so a requested `xmin` past the reference `xmax` is rejected.
pub fn fill_missing(
    requested: &PartialBox,
    reference: Option<&BoundingBox>,
) -> Result<BoundingBox> {
    let pick = |value: Option<f64>, field: &'static str, from: fn(&BoundingBox) -> f64| {
        value
            .or_else(|| reference.map(from))
            .ok_or(InsetError::MissingReference { field })
    };
    let xmin = pick(requested.xmin, "xmin", |r| r.xmin)?;
    let ymin = pick(requested.ymin, "ymin", |r| r.ymin)?;
    let xmax = pick(requested.xmax, "xmax", |r| r.xmax)?;
    let ymax = pick(requested.ymax, "ymax", |r| r.ymax)?;
    BoundingBox::checked(xmin, ymin, xmax, ymax)
}

/// Ranges and aspect ratio. Both ranges must be strictly positive and finite.
pub fn features(b: &BoundingBox) -> Result<ExtentFeatures> {
    let x_range = b.x_range();
    let y_range = b.y_range();
    // NaN fails both comparisons, so it is rejected here too.
    if !(x_range > 0.0 && y_range > 0.0 && x_range.is_finite() && y_range.is_finite()) {
        return Err(InsetError::DegenerateExtent {
            index: None,
            x_range,
            y_range,
        });
    }
    Ok(ExtentFeatures {
        x_range,
        y_range,
        aspect_ratio: x_range / y_range,
    })
}

fn check_axis(axis: Axis, min: f64, max: f64) -> Result<()> {
    if min < max {
        Ok(())
    } else {
        Err(InsetError::InvertedBounds { axis, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_overlapping_boxes() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 2.0, 2.0),
            BoundingBox::new(1.0, 1.0, 3.0, 3.0),
            BoundingBox::new(-1.0, -1.0, 1.0, 1.0),
        ];
        assert_eq!(union(&boxes).unwrap(), BoundingBox::new(-1.0, -1.0, 3.0, 3.0));
    }

    #[test]
    fn union_of_single_box_is_identity() {
        let b = BoundingBox::new(-84.0, 33.0, -75.0, 37.0);
        assert_eq!(union(&[b]).unwrap(), b);
        assert_eq!(union(&[b, b, b]).unwrap(), b);
    }

    #[test]
    fn union_rejects_empty_input() {
        assert_eq!(union(&[]), Err(InsetError::EmptyInput));
    }

    #[test]
    fn fill_missing_only_overwrites_pending_fields() {
        let requested = PartialBox {
            xmin: None,
            xmax: Some(-75.0),
            ymin: Some(33.0),
            ymax: Some(37.0),
        };
        let reference = BoundingBox::new(-84.0, 30.0, -70.0, 40.0);
        let filled = fill_missing(&requested, Some(&reference)).unwrap();
        assert_eq!(filled, BoundingBox::new(-84.0, 33.0, -75.0, 37.0));
    }

    #[test]
    fn fill_missing_without_reference() {
        let complete = PartialBox::from(BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert!(fill_missing(&complete, None).is_ok());

        let partial = PartialBox {
            ymax: None,
            ..complete
        };
        assert_eq!(
            fill_missing(&partial, None),
            Err(InsetError::MissingReference { field: "ymax" })
        );
    }

    #[test]
    fn fill_missing_detects_inversion_against_reference() {
        let requested = PartialBox {
            xmin: Some(10.0),
            ..PartialBox::pending()
        };
        let reference = BoundingBox::new(0.0, 0.0, 5.0, 5.0);
        assert!(matches!(
            fill_missing(&requested, Some(&reference)),
            Err(InsetError::InvertedBounds { axis: Axis::X, .. })
        ));
    }

    #[test]
    fn features_of_box() {
        let f = features(&BoundingBox::new(-84.0, 33.0, -75.0, 37.0)).unwrap();
        assert_eq!(f.x_range, 9.0);
        assert_eq!(f.y_range, 4.0);
        assert_eq!(f.aspect_ratio, 2.25);
    }

    #[test]
    fn features_rejects_flat_extent() {
        let flat = BoundingBox::new(0.0, 1.0, 4.0, 1.0);
        assert!(matches!(
            features(&flat),
            Err(InsetError::DegenerateExtent { .. })
        ));
        let thin = BoundingBox::new(2.0, 0.0, 2.0, 4.0);
        assert!(features(&thin).is_err());
    }

    #[test]
    fn partial_validate_checks_known_axes_only() {
        let b = PartialBox {
            xmin: Some(5.0),
            xmax: Some(1.0),
            ..PartialBox::pending()
        };
        assert!(matches!(
            b.validate(),
            Err(InsetError::InvertedBounds { axis: Axis::X, .. })
        ));
        let half = PartialBox {
            ymin: Some(5.0),
            ..PartialBox::pending()
        };
        assert!(half.validate().is_ok());
    }
}
