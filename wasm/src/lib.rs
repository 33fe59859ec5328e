use inset_layout::config::LayoutOptions;
use inset_layout::parser::parse_job;
use inset_layout::sizing::output_size_for;
use inset_layout::{
    ComposeOptions, EmptyInsetPolicy, IdentityProjector, PlotSource, SvgRenderer, Theme, compose,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsetRenderOptions {
    theme: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
    ratio_scale: Option<f64>,
    background: Option<String>,
    placeholders: Option<bool>,
}

const DEFAULT_WIDTH: f64 = 1200.0;

fn compose_svg(job: &str, options: InsetRenderOptions) -> Result<String, String> {
    let theme = match options.theme.as_deref() {
        Some(name) => Theme::by_name(name).ok_or_else(|| format!("Unknown theme: {name}"))?,
        None => Theme::default(),
    };
    let job = parse_job(job).map_err(|error| format!("{error:#}"))?;

    let preview = job
        .clone()
        .into_builder(&LayoutOptions::default())
        .resolve(&IdentityProjector)
        .map_err(|error| error.to_string())?;
    let width = match (options.width, options.height) {
        (None, None) => Some(DEFAULT_WIDTH),
        (width, _) => width,
    };
    let size = output_size_for(
        &preview,
        width,
        options.height,
        options.ratio_scale.unwrap_or(1.0),
    )
    .map_err(|error| error.to_string())?;

    let configuration = job
        .into_builder(&LayoutOptions::default())
        .full_ratio(size.width / size.height)
        .resolve(&IdentityProjector)
        .map_err(|error| error.to_string())?;

    let mut renderer = SvgRenderer::new(size.width, size.height);
    if let Some(background) = options.background {
        renderer = renderer.with_background(background);
    }
    let empty_insets = if options.placeholders.unwrap_or(true) {
        EmptyInsetPolicy::Placeholder
    } else {
        EmptyInsetPolicy::Fail
    };
    let composition = compose(
        &renderer,
        PlotSource::Shared(&theme),
        Some(&configuration),
        ComposeOptions {
            return_details: false,
            empty_insets,
        },
    )
    .map_err(|error| error.to_string())?;
    Ok(composition.full().to_document(size.width, size.height))
}

#[wasm_bindgen]
pub fn compose_inset_svg(job: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<InsetRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        InsetRenderOptions::default()
    };

    compose_svg(job, options).map_err(|error| JsValue::from_str(&error))
}
