use std::sync::Arc;

use crate::configuration::{self, LayoutConfiguration, ResolvedSpec};
use crate::error::{InsetError, Result};
use crate::layout::{self, ResolvedLayout, Resolution};
use crate::render::Renderer;
use crate::theme::Theme;

/// Where each subplot's render object comes from.
#[derive(Debug, Clone)]
pub enum PlotSource<'a, A> {
    /// A finished artifact, returned unchanged without any layout work.
    AsIs(A),
    /// One theme for every spec without its own.
    Shared(&'a Theme),
    /// One theme per spec, in spec order.
    PerSpec(&'a [Theme]),
    /// Only the themes carried by the specs themselves.
    SpecDefined,
}

/// What to do with an inset whose crop holds no data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyInsetPolicy {
    #[default]
    Fail,
    Placeholder,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeOptions {
    pub return_details: bool,
    pub empty_insets: EmptyInsetPolicy,
}

#[derive(Debug, Clone)]
pub struct CompositionDetails<A> {
    pub full: A,
    /// Rendered subplots in spec order, insets already framed.
    pub subplots: Vec<A>,
    /// Placement of every subplot in spec order; the main spec covers the canvas.
    pub layouts: Vec<ResolvedLayout>,
    pub main_ratio: f64,
}

#[derive(Debug, Clone)]
pub enum Composition<A> {
    Full(A),
    Detailed(CompositionDetails<A>),
}

impl<A> Composition<A> {
    pub fn full(&self) -> &A {
        match self {
            Composition::Full(full) => full,
            Composition::Detailed(details) => &details.full,
        }
    }

    pub fn into_full(self) -> A {
        match self {
            Composition::Full(full) => full,
            Composition::Detailed(details) => details.full,
        }
    }

    pub fn details(&self) -> Option<&CompositionDetails<A>> {
        match self {
            Composition::Full(_) => None,
            Composition::Detailed(details) => Some(details),
        }
    }
}

/// Render every subplot and lay the insets over the main plot.
///
/// With `configuration` unset, the most recently built configuration is used.
/// A renderer with a fixed canvas must match the configuration's `full_ratio`.
pub fn compose<R: Renderer>(
    renderer: &R,
    source: PlotSource<'_, R::Artifact>,
    configuration: Option<&LayoutConfiguration>,
    options: ComposeOptions,
) -> Result<Composition<R::Artifact>> {
    let source = match source {
        PlotSource::AsIs(artifact) => return Ok(Composition::Full(artifact)),
        other => other,
    };

    let stored: Arc<LayoutConfiguration>;
    let configuration = match configuration {
        Some(configuration) => configuration,
        None => {
            stored = configuration::last_configuration()?;
            stored.as_ref()
        }
    };

    if let Some(actual) = renderer.canvas_ratio() {
        let expected = configuration.full_ratio();
        let drift = ((actual - expected) / expected).abs();
        if drift.is_nan() || drift > layout::RATIO_TOLERANCE {
            return Err(InsetError::CanvasRatioMismatch { expected, actual });
        }
    }

    let subplots = configuration.subplots();
    if let PlotSource::PerSpec(themes) = &source
        && themes.len() != subplots.len()
    {
        return Err(InsetError::RenderObjectCountMismatch {
            expected: subplots.len(),
            actual: themes.len(),
        });
    }

    let resolution = match options.empty_insets {
        EmptyInsetPolicy::Fail => layout::resolve_layouts(configuration)?,
        EmptyInsetPolicy::Placeholder => layout::resolve_layouts_lenient(configuration)?,
    };
    let placements = placements_by_index(&resolution, subplots.len());

    let mut rendered = Vec::with_capacity(subplots.len());
    for subplot in subplots {
        let theme = select_theme(&source, subplot)?;
        let artifact = match placements[subplot.index()] {
            Some((_, true)) => renderer.placeholder(theme, subplot)?,
            _ => renderer.render(theme, subplot, configuration.crs())?,
        };
        let artifact = if subplot.is_main() {
            artifact
        } else {
            renderer.apply_border(artifact, configuration.border())
        };
        rendered.push(artifact);
    }

    let main_index = configuration.main().index();
    let insets: Vec<(R::Artifact, ResolvedLayout)> = subplots
        .iter()
        .filter_map(|subplot| {
            placements[subplot.index()]
                .map(|(layout, _)| (rendered[subplot.index()].clone(), layout))
        })
        .collect();
    let full = renderer.place(&rendered[main_index], &insets)?;
    tracing::info!(
        subplots = subplots.len(),
        main_ratio = configuration.main_ratio(),
        "composed inset map"
    );

    if !options.return_details {
        return Ok(Composition::Full(full));
    }
    let layouts = subplots
        .iter()
        .map(|subplot| {
            placements[subplot.index()]
                .map(|(layout, _)| layout)
                .unwrap_or(ResolvedLayout::FULL)
        })
        .collect();
    Ok(Composition::Detailed(CompositionDetails {
        full,
        subplots: rendered,
        layouts,
        main_ratio: configuration.main_ratio(),
    }))
}

fn placements_by_index(
    resolution: &Resolution,
    count: usize,
) -> Vec<Option<(ResolvedLayout, bool)>> {
    let mut slots = vec![None; count];
    for placement in &resolution.placements {
        if let Some(slot) = slots.get_mut(placement.index) {
            *slot = Some((placement.layout, placement.placeholder));
        }
    }
    slots
}

fn select_theme<'a, A>(
    source: &'a PlotSource<'a, A>,
    subplot: &'a ResolvedSpec,
) -> Result<&'a Theme> {
    if let Some(theme) = subplot.spec().theme() {
        return Ok(theme);
    }
    match source {
        PlotSource::Shared(theme) => Ok(*theme),
        PlotSource::PerSpec(themes) => themes
            .get(subplot.index())
            .ok_or(InsetError::MissingRenderObject {
                index: subplot.index(),
            }),
        PlotSource::SpecDefined | PlotSource::AsIs(_) => Err(InsetError::MissingRenderObject {
            index: subplot.index(),
        }),
    }
}
