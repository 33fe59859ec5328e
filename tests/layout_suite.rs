use std::path::Path;

use inset_layout::config::LayoutOptions;
use inset_layout::layout_dump::write_layout_dump;
use inset_layout::parser::parse_job;
use inset_layout::sizing::output_size_for;
use inset_layout::{
    ComposeOptions, ConfigurationStore, IdentityProjector, InsetError, LayoutConfiguration,
    PlotSource, SvgPlot, SvgRenderer, Theme, compose, last_configuration, resolve_layouts,
};

// Extents come out of polygon clipping, which may nudge coordinates.
fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(path).expect("fixture read failed")
}

fn build_fixture(store: &ConfigurationStore) -> std::sync::Arc<LayoutConfiguration> {
    let job = parse_job(&fixture("states.json5")).expect("parse failed");
    job.into_builder(&LayoutOptions::default())
        .build_in(store, &IdentityProjector)
        .expect("build failed")
}

fn renderer_for(config: &LayoutConfiguration) -> SvgRenderer {
    SvgRenderer::new(1000.0, 1000.0 / config.full_ratio())
}

#[test]
fn composes_fixture_without_distortion() {
    let store = ConfigurationStore::new();
    let config = build_fixture(&store);
    let theme = Theme::classic();
    let renderer = renderer_for(&config);

    let composition = compose(
        &renderer,
        PlotSource::Shared(&theme),
        Some(&config),
        ComposeOptions {
            return_details: true,
            ..ComposeOptions::default()
        },
    )
    .expect("compose failed");
    let details = composition.details().expect("details requested");
    assert_eq!(details.subplots.len(), 3);
    assert_eq!(details.layouts.len(), 3);
    assert!(approx(details.main_ratio, 103.0 / 52.0));

    for subplot in config.insets() {
        let layout = details.layouts[subplot.index()];
        let data_ratio = subplot.extent_features().unwrap().aspect_ratio;
        let pixel_ratio = (layout.width * renderer.width) / (layout.height * renderer.height);
        assert!(
            approx(pixel_ratio, data_ratio),
            "inset {} drawn at {pixel_ratio}, data is {data_ratio}",
            subplot.index()
        );
    }

    // The second inset carries its own theme.
    assert!(details.subplots[2].body.contains(&Theme::modern().fill));
    assert!(!details.subplots[1].body.contains(&Theme::modern().fill));

    let svg = composition.full().to_document(renderer.width, renderer.height);
    assert!(svg.contains("<svg"));
    assert!(svg.contains("</svg>"));
    assert_eq!(svg.matches("preserveAspectRatio=\"none\"").count(), 2);
}

#[test]
fn anchored_and_explicit_positions() {
    let store = ConfigurationStore::new();
    let config = build_fixture(&store);
    let resolution = resolve_layouts(&config).unwrap();
    let layouts = resolution.layouts();
    assert_eq!(layouts.len(), 2);

    // "left bottom" sits one margin in from both edges.
    assert!(approx(layouts[0].x, config.margin()));
    assert!(approx(layouts[0].y, config.margin()));
    assert!(approx(layouts[0].width, 0.25));

    assert!(approx(layouts[1].x, 0.3));
    assert!(approx(layouts[1].y, 0.02));
    assert!(approx(layouts[1].height, 0.1));
}

#[test]
fn store_tracks_last_build() {
    let store = ConfigurationStore::new();
    assert_eq!(store.get().unwrap_err(), InsetError::NoConfiguration);
    let built = build_fixture(&store);
    let stored = store.get().unwrap();
    assert!(std::sync::Arc::ptr_eq(&built, &stored));
    store.clear();
    assert_eq!(store.get().unwrap_err(), InsetError::NoConfiguration);
}

#[test]
fn compose_without_configuration_uses_last_build() {
    let job = parse_job(&fixture("states.json5")).unwrap();
    let built = job
        .into_builder(&LayoutOptions::default())
        .build()
        .unwrap();
    assert!(last_configuration().is_ok());

    let theme = Theme::classic();
    let composition = compose(
        &renderer_for(&built),
        PlotSource::Shared(&theme),
        None,
        ComposeOptions::default(),
    )
    .unwrap();
    assert!(composition.details().is_none());
    assert!(composition.full().body.contains("data-layer=\"states\""));
}

#[test]
fn as_is_returns_the_artifact() {
    let plot = SvgPlot {
        width: 4.0,
        height: 3.0,
        body: "<rect/>".to_string(),
    };
    let composition = compose(
        &SvgRenderer::new(40.0, 30.0),
        PlotSource::AsIs(plot.clone()),
        None,
        ComposeOptions {
            return_details: true,
            ..ComposeOptions::default()
        },
    )
    .unwrap();
    assert_eq!(composition.into_full(), plot);
}

#[test]
fn per_spec_themes_are_counted() {
    let store = ConfigurationStore::new();
    let config = build_fixture(&store);
    let themes = vec![Theme::classic(), Theme::modern()];
    let err = compose(
        &renderer_for(&config),
        PlotSource::PerSpec(&themes),
        Some(&config),
        ComposeOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        InsetError::RenderObjectCountMismatch {
            expected: 3,
            actual: 2
        }
    );
}

#[test]
fn output_size_follows_main_ratio() {
    let store = ConfigurationStore::new();
    let config = build_fixture(&store);
    let size = output_size_for(&config, Some(1030.0), None, 1.0).unwrap();
    assert!(approx(size.height, 520.0));
    assert!(size.advisories.is_empty());
}

#[test]
fn writes_layout_dump() {
    let store = ConfigurationStore::new();
    let config = build_fixture(&store);
    let resolution = resolve_layouts(&config).unwrap();
    let path = std::env::temp_dir().join(format!("inset-layout-dump-{}.json", std::process::id()));
    write_layout_dump(&path, &config, &resolution).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let subplots = value["subplots"].as_array().unwrap();
    assert_eq!(subplots.len(), 3);
    assert_eq!(subplots[0]["is_main"], true);
    let xmin = subplots[1]["data_extent"][0].as_f64().unwrap();
    assert!(approx(xmin, -170.0));
}
