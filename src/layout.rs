//! Inset placement.
//!
//! Turns a resolved [`LayoutConfiguration`] into one normalized rectangle per
//! inset. Rectangles are canvas fractions anchored bottom-left. Unless the
//! caller forced both dimensions, every rectangle has
//! `width / height == data_aspect / full_ratio`, so the inset is drawn
//! without distortion on a canvas of ratio `full_ratio`.
//!
//! Placement is not clamped: an inset positioned past the canvas edge stays
//! there.

use serde::Serialize;

use crate::bbox::{self, ExtentFeatures};
use crate::configuration::{LayoutConfiguration, ResolvedSpec};
use crate::error::{self, Advisory, InsetError, Result};
use crate::spec::{HAlign, Position, SizeMode, VAlign};

pub(crate) const RATIO_TOLERANCE: f64 = 1e-9;

/// Normalized canvas rectangle, origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedLayout {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ResolvedLayout {
    /// The whole canvas, where the main subplot goes.
    pub const FULL: ResolvedLayout = ResolvedLayout {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };
}

/// How much of the canvas the letterboxed main subplot covers per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionFactors {
    pub width: f64,
    pub height: f64,
}

pub fn compression_factors(main_ratio: f64, full_ratio: f64) -> CompressionFactors {
    if full_ratio > main_ratio {
        // Canvas wider than the data: pillarboxed.
        CompressionFactors {
            width: main_ratio / full_ratio,
            height: 1.0,
        }
    } else if full_ratio < main_ratio {
        // Canvas taller than the data: letterboxed.
        CompressionFactors {
            width: 1.0,
            height: full_ratio / main_ratio,
        }
    } else {
        CompressionFactors {
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Canvas size of an inset, in canvas fractions.
///
/// Scale-factor sizing keeps the inset at `scale_factor` times the main
/// subplot's data-to-canvas scale. Single-dimension sizing derives the other
/// dimension from the inset's data ratio. `Both` is returned unchanged.
pub fn inset_size(
    size: SizeMode,
    inset: &ExtentFeatures,
    main: &ExtentFeatures,
    factors: CompressionFactors,
) -> (f64, f64) {
    let rel_x = inset.x_range / main.x_range;
    let rel_y = inset.y_range / main.y_range;
    match size {
        SizeMode::ScaleFactor(scale) => (
            rel_x * factors.width * scale,
            rel_y * factors.height * scale,
        ),
        SizeMode::Width(width) => (width, width / effective_ratio(rel_x, rel_y, factors)),
        SizeMode::Height(height) => (height * effective_ratio(rel_x, rel_y, factors), height),
        SizeMode::Both { width, height } => (width, height),
    }
}

// Inset ratio relative to the main subplot, carried through the main
// subplot's own compression. Equals data_aspect / full_ratio.
fn effective_ratio(rel_x: f64, rel_y: f64, factors: CompressionFactors) -> f64 {
    (rel_x / rel_y) * factors.width / factors.height
}

/// Bottom-left corner of an inset of the given size.
pub fn inset_origin(position: Position, width: f64, height: f64, margin: f64) -> (f64, f64) {
    match position {
        Position::Explicit { left, bottom } => (left, bottom),
        Position::Anchor(anchor) => {
            let x = match anchor.horizontal {
                HAlign::Left => margin,
                HAlign::Center => 0.5 - width / 2.0,
                HAlign::Right => 1.0 - width - margin,
            };
            let y = match anchor.vertical {
                VAlign::Bottom => margin,
                VAlign::Center => 0.5 - height / 2.0,
                VAlign::Top => 1.0 - height - margin,
            };
            (x, y)
        }
    }
}

/// One placed inset.
#[derive(Debug, Clone, PartialEq)]
pub struct InsetPlacement {
    /// Index of the spec in the configuration.
    pub index: usize,
    pub layout: ResolvedLayout,
    /// Sized from the requested bbox because the crop was empty.
    pub placeholder: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub placements: Vec<InsetPlacement>,
    pub advisories: Vec<Advisory>,
}

impl Resolution {
    pub fn layouts(&self) -> Vec<ResolvedLayout> {
        self.placements.iter().map(|p| p.layout).collect()
    }
}

pub struct LayoutResolver<'a> {
    configuration: &'a LayoutConfiguration,
    main: ExtentFeatures,
    factors: CompressionFactors,
}

impl<'a> LayoutResolver<'a> {
    pub fn new(configuration: &'a LayoutConfiguration) -> Result<Self> {
        let main = configuration.main().extent_features()?;
        let factors = compression_factors(main.aspect_ratio, configuration.full_ratio());
        Ok(Self {
            configuration,
            main,
            factors,
        })
    }

    pub fn factors(&self) -> CompressionFactors {
        self.factors
    }

    /// Place one inset from its data extent.
    pub fn resolve_inset(
        &self,
        subplot: &ResolvedSpec,
    ) -> Result<(ResolvedLayout, Option<Advisory>)> {
        let inset = subplot.extent_features()?;
        Ok(self.place(subplot, &inset))
    }

    /// Place every inset, aborting on the first degenerate extent.
    pub fn resolve(&self) -> Result<Resolution> {
        self.resolve_with(|subplot| subplot.extent_features().map(|f| (f, false)))
    }

    /// Place every inset; an inset whose crop is empty is sized from its
    /// requested bbox instead.
    pub fn resolve_lenient(&self) -> Result<Resolution> {
        self.resolve_with(|subplot| match subplot.extent_features() {
            Ok(features) => Ok((features, false)),
            Err(InsetError::DegenerateExtent { .. }) => bbox::features(subplot.resolved_bbox())
                .map(|f| (f, true))
                .map_err(|err| match err {
                    InsetError::DegenerateExtent {
                        x_range, y_range, ..
                    } => InsetError::DegenerateExtent {
                        index: Some(subplot.index()),
                        x_range,
                        y_range,
                    },
                    other => other,
                }),
            Err(other) => Err(other),
        })
    }

    fn resolve_with<F>(&self, mut extent: F) -> Result<Resolution>
    where
        F: FnMut(&ResolvedSpec) -> Result<(ExtentFeatures, bool)>,
    {
        let mut resolution = Resolution::default();
        for subplot in self.configuration.insets() {
            let (features, placeholder) = extent(subplot)?;
            let (layout, advisory) = self.place(subplot, &features);
            resolution.placements.push(InsetPlacement {
                index: subplot.index(),
                layout,
                placeholder,
            });
            resolution.advisories.extend(advisory);
        }
        Ok(resolution)
    }

    fn place(
        &self,
        subplot: &ResolvedSpec,
        inset: &ExtentFeatures,
    ) -> (ResolvedLayout, Option<Advisory>) {
        let size = subplot.spec().size();
        let (width, height) = inset_size(size, inset, &self.main, self.factors);
        let (x, y) = inset_origin(
            subplot.spec().position(),
            width,
            height,
            self.configuration.margin(),
        );
        tracing::debug!(index = subplot.index(), x, y, width, height, "placed inset");

        let advisory = match size {
            SizeMode::Both { .. } => {
                let expected_ratio = inset.aspect_ratio / self.configuration.full_ratio();
                let actual_ratio = width / height;
                let distorted =
                    ((actual_ratio - expected_ratio) / expected_ratio).abs() > RATIO_TOLERANCE;
                distorted.then_some(Advisory::DistortedInset {
                    index: subplot.index(),
                    expected_ratio,
                    actual_ratio,
                })
            }
            _ => None,
        };
        if let Some(advisory) = &advisory {
            error::emit(advisory);
        }

        (
            ResolvedLayout {
                x,
                y,
                width,
                height,
            },
            advisory,
        )
    }
}

/// Place every inset of `configuration`; any degenerate extent fails the call.
pub fn resolve_layouts(configuration: &LayoutConfiguration) -> Result<Resolution> {
    LayoutResolver::new(configuration)?.resolve()
}

/// Like [`resolve_layouts`], but empty crops fall back to the requested bbox.
pub fn resolve_layouts_lenient(configuration: &LayoutConfiguration) -> Result<Resolution> {
    LayoutResolver::new(configuration)?.resolve_lenient()
}
