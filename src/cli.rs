use crate::compose::{ComposeOptions, EmptyInsetPolicy, PlotSource, compose};
use crate::config::load_config;
use crate::layout::resolve_layouts_lenient;
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_job;
use crate::render::{SvgRenderer, write_output_svg};
use crate::sizing::output_size_for;
use crate::spatial::IdentityProjector;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::EnvFilter;

const DEFAULT_WIDTH: f64 = 1200.0;

#[derive(Parser, Debug)]
#[command(name = "insetmap", version, about = "Compose a main map with aspect-correct insets")]
pub struct Args {
    /// Job file (.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, layout, render and border sections)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Output width in px; derived from the main ratio when omitted
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Output height in px; derived from the main ratio when omitted
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// Multiplier applied to the main ratio when deriving a dimension
    #[arg(long = "ratio-scale")]
    pub ratio_scale: Option<f64>,

    /// Write the resolved layout as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Log layout decisions to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let job = parse_job(&input)?;

    // The main ratio does not depend on the canvas, so a first pass sizes the output.
    let preview = job
        .clone()
        .into_builder(&config.layout)
        .resolve(&IdentityProjector)?;
    let mut width = args.width.or(config.render.width);
    let height = args.height.or(config.render.height);
    if width.is_none() && height.is_none() {
        width = Some(DEFAULT_WIDTH);
    }
    let ratio_scale = args.ratio_scale.unwrap_or(config.render.ratio_scale);
    let size = output_size_for(&preview, width, height, ratio_scale)?;
    let canvas_ratio = size.width / size.height;
    tracing::debug!(width = size.width, height = size.height, canvas_ratio, "output size");

    let configuration = job
        .into_builder(&config.layout)
        .full_ratio(canvas_ratio)
        .border(config.border.clone())
        .build()?;

    let resolution = resolve_layouts_lenient(&configuration)?;
    for placement in resolution.placements.iter().filter(|p| p.placeholder) {
        tracing::warn!(index = placement.index, "inset crop is empty, drawing a placeholder");
    }
    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &configuration, &resolution)?;
    }

    let renderer = SvgRenderer::new(size.width, size.height)
        .with_background(config.render.background.clone());
    let composition = compose(
        &renderer,
        PlotSource::Shared(&config.theme),
        Some(&configuration),
        ComposeOptions {
            return_details: false,
            empty_insets: EmptyInsetPolicy::Placeholder,
        },
    )?;
    let svg = composition.full().to_document(size.width, size.height);

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&svg, &output)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .try_init();
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path) -> Result<()> {
    crate::render::write_output_png(svg, output)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
