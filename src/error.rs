use thiserror::Error;

/// Axis of a bounding box or extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsetError {
    #[error("cannot take the union of an empty list of bounding boxes")]
    EmptyInput,

    #[error("bounding box field `{field}` is pending and no reference extent was given")]
    MissingReference { field: &'static str },

    #[error("degenerate extent for subplot {index:?}: x_range={x_range}, y_range={y_range}")]
    DegenerateExtent {
        index: Option<usize>,
        x_range: f64,
        y_range: f64,
    },

    #[error("inverted {axis} bounds: min {min} must be less than max {max}")]
    InvertedBounds { axis: Axis, min: f64, max: f64 },

    #[error("invalid position `{0}`: expected {{left,center,right}} x {{bottom,center,top}}")]
    InvalidPosition(String),

    #[error("position {name}={value} is outside [0, 1]")]
    PositionOutOfRange { name: &'static str, value: f64 },

    #[error("margin {0} is outside [0, 0.5)")]
    MarginOutOfRange(f64),

    #[error("explicit position needs both loc_left and loc_bottom")]
    IncompletePosition,

    #[error("size {name}={value} is outside (0, 1]")]
    SizeOutOfRange { name: &'static str, value: f64 },

    #[error("scale_factor={0} must be finite and greater than 0")]
    ScaleFactorOutOfRange(f64),

    #[error("no main subplot spec in configuration")]
    NoMainSpec,

    #[error("configuration has {count} main subplot specs; exactly one is required")]
    MultipleMainSpec { count: usize },

    #[error("configuration has no subplot specs")]
    EmptySpecList,

    #[error("canvas ratio {0} must be finite and greater than 0")]
    InvalidRatio(f64),

    #[error("no layout configuration available; build one first")]
    NoConfiguration,

    #[error("subplot {index} has no render object and no shared default was given")]
    MissingRenderObject { index: usize },

    #[error("expected {expected} render objects (one per spec), got {actual}")]
    RenderObjectCountMismatch { expected: usize, actual: usize },

    #[error("cannot reproject layer `{layer}` from {from} to {to}")]
    Projection {
        layer: String,
        from: String,
        to: String,
    },

    #[error("output {name}={value} must be finite and greater than 0")]
    OutputSizeOutOfRange { name: &'static str, value: f64 },

    #[error("output size needs a width or a height")]
    MissingOutputDimension,

    #[error("renderer canvas ratio {actual} does not match the configured full_ratio {expected}")]
    CanvasRatioMismatch { expected: f64, actual: f64 },

    #[error("render failed: {0}")]
    Render(String),
}

/// Non-fatal notice. Execution continues; callers decide whether to surface it.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// No width, height or scale_factor given; scale_factor 1.0 was used.
    DefaultScaleFactor,
    /// Width and height were both given; the inset may be distorted.
    RedundantSize { width: f64, height: f64 },
    /// scale_factor was given along with an explicit size; the size is ignored.
    ScaleFactorOverridesSize { scale_factor: f64 },
    /// Both output dimensions were given; the saved ratio may not match the layout.
    BothOutputDimensions { width: f64, height: f64 },
    /// The resolver kept both explicit dimensions of an inset.
    DistortedInset {
        index: usize,
        expected_ratio: f64,
        actual_ratio: f64,
    },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::DefaultScaleFactor => {
                f.write_str("no width, height or scale_factor given; using scale_factor = 1.0")
            }
            Advisory::RedundantSize { width, height } => write!(
                f,
                "both width ({width}) and height ({height}) given; the inset may be distorted"
            ),
            Advisory::ScaleFactorOverridesSize { scale_factor } => write!(
                f,
                "scale_factor ({scale_factor}) given with width/height; explicit sizes are ignored"
            ),
            Advisory::BothOutputDimensions { width, height } => write!(
                f,
                "both output width ({width}) and height ({height}) given; output ratio may not match the layout"
            ),
            Advisory::DistortedInset {
                index,
                expected_ratio,
                actual_ratio,
            } => write!(
                f,
                "inset {index} keeps width/height {actual_ratio:.4} instead of data ratio {expected_ratio:.4}"
            ),
        }
    }
}

pub(crate) fn emit(advisory: &Advisory) {
    tracing::warn!(%advisory, "layout advisory");
}

pub type Result<T> = std::result::Result<T, InsetError>;
