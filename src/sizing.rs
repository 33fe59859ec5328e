use crate::configuration::LayoutConfiguration;
use crate::error::{self, Advisory, InsetError, Result};

/// Physical output size for a saved composition.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSize {
    pub width: f64,
    pub height: f64,
    pub advisories: Vec<Advisory>,
}

/// Fill in the missing output dimension from `main_ratio * ratio_scale`.
///
/// When both dimensions are given they are kept, with an advisory: the
/// output ratio may then disagree with the layout.
pub fn output_size(
    width: Option<f64>,
    height: Option<f64>,
    main_ratio: f64,
    ratio_scale: f64,
) -> Result<OutputSize> {
    let ratio = main_ratio * ratio_scale;
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(InsetError::InvalidRatio(ratio));
    }
    for (name, value) in [("width", width), ("height", height)] {
        if let Some(value) = value
            && !(value.is_finite() && value > 0.0)
        {
            return Err(InsetError::OutputSizeOutOfRange { name, value });
        }
    }

    match (width, height) {
        (Some(width), Some(height)) => {
            let advisory = Advisory::BothOutputDimensions { width, height };
            error::emit(&advisory);
            Ok(OutputSize {
                width,
                height,
                advisories: vec![advisory],
            })
        }
        (Some(width), None) => Ok(OutputSize {
            width,
            height: width / ratio,
            advisories: Vec::new(),
        }),
        (None, Some(height)) => Ok(OutputSize {
            width: height * ratio,
            height,
            advisories: Vec::new(),
        }),
        (None, None) => Err(InsetError::MissingOutputDimension),
    }
}

/// [`output_size`] using the configuration's main ratio.
pub fn output_size_for(
    configuration: &LayoutConfiguration,
    width: Option<f64>,
    height: Option<f64>,
    ratio_scale: f64,
) -> Result<OutputSize> {
    output_size(width, height, configuration.main_ratio(), ratio_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_height_from_width() {
        let size = output_size(Some(9.0), None, 2.25, 1.0).unwrap();
        assert_eq!(size.height, 4.0);
        assert!(size.advisories.is_empty());
    }

    #[test]
    fn derives_width_from_height_with_ratio_scale() {
        let size = output_size(None, Some(4.0), 2.25, 1.2).unwrap();
        assert!((size.width - 10.8).abs() < 1e-9);
    }

    #[test]
    fn both_dimensions_are_advised() {
        let size = output_size(Some(10.0), Some(10.0), 2.25, 1.0).unwrap();
        assert_eq!((size.width, size.height), (10.0, 10.0));
        assert_eq!(
            size.advisories,
            vec![Advisory::BothOutputDimensions {
                width: 10.0,
                height: 10.0
            }]
        );
    }

    #[test]
    fn needs_one_dimension() {
        assert_eq!(
            output_size(None, None, 1.0, 1.0),
            Err(InsetError::MissingOutputDimension)
        );
        assert_eq!(
            output_size(Some(-1.0), None, 1.0, 1.0),
            Err(InsetError::OutputSizeOutOfRange {
                name: "width",
                value: -1.0
            })
        );
        assert!(output_size(Some(1.0), None, 1.0, 0.0).is_err());
    }
}
