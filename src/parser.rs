use crate::config::LayoutOptions;
use crate::configuration::ConfigurationBuilder;
use crate::spatial::{Crs, FeatureLayer};
use crate::spec::SubplotSpec;
use crate::theme::Theme;
use anyhow::{Context, Result};
use geo_types::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use serde::Deserialize;

/// A parsed job file: the data layers and the subplots to draw from them.
#[derive(Debug, Clone)]
pub struct Job {
    pub layers: Vec<FeatureLayer>,
    pub specs: Vec<SubplotSpec>,
    pub crs: Option<Crs>,
    pub data_crs: Option<Crs>,
    pub full_ratio: Option<f64>,
    pub margin: Option<f64>,
}

impl Job {
    /// Configuration builder for this job. Values set in the job win over `defaults`.
    pub fn into_builder(self, defaults: &LayoutOptions) -> ConfigurationBuilder {
        let mut builder = ConfigurationBuilder::new(self.layers)
            .specs(self.specs)
            .options(defaults);
        if let Some(full_ratio) = self.full_ratio {
            builder = builder.full_ratio(full_ratio);
        }
        if let Some(margin) = self.margin {
            builder = builder.margin(margin);
        }
        if let Some(crs) = self.crs {
            builder = builder.crs(crs);
        }
        if let Some(crs) = self.data_crs {
            builder = builder.data_crs(crs);
        }
        builder
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobFile {
    #[serde(default)]
    layers: Vec<LayerInput>,
    #[serde(default)]
    specs: Vec<SpecInput>,
    crs: Option<String>,
    data_crs: Option<String>,
    full_ratio: Option<f64>,
    margin: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayerInput {
    name: String,
    crs: Option<String>,
    #[serde(default)]
    features: Vec<FeatureInput>,
}

type Ring = Vec<[f64; 2]>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum FeatureInput {
    Point { coordinates: [f64; 2] },
    MultiPoint { coordinates: Vec<[f64; 2]> },
    Line { coordinates: Ring },
    MultiLine { coordinates: Vec<Ring> },
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SpecInput {
    main: bool,
    xmin: Option<f64>,
    xmax: Option<f64>,
    ymin: Option<f64>,
    ymax: Option<f64>,
    position: Option<String>,
    loc_left: Option<f64>,
    loc_bottom: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    scale_factor: Option<f64>,
    theme: Option<ThemeInput>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ThemeInput {
    Named(String),
    Custom(Theme),
}

pub fn parse_job(input: &str) -> Result<Job> {
    let file: JobFile = json5::from_str(input).context("invalid job file")?;

    let layers = file
        .layers
        .into_iter()
        .map(layer_from_input)
        .collect::<Result<Vec<_>>>()?;

    let specs = file
        .specs
        .into_iter()
        .enumerate()
        .map(|(idx, spec)| spec_from_input(spec).with_context(|| format!("spec {idx}")))
        .collect::<Result<Vec<_>>>()?;

    Ok(Job {
        layers,
        specs,
        crs: file.crs.map(Crs::new),
        data_crs: file.data_crs.map(Crs::new),
        full_ratio: file.full_ratio,
        margin: file.margin,
    })
}

fn layer_from_input(layer: LayerInput) -> Result<FeatureLayer> {
    let geometries = layer
        .features
        .into_iter()
        .map(geometry_from_input)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("layer {}", layer.name))?;
    let mut out = FeatureLayer::new(layer.name, geometries);
    if let Some(crs) = layer.crs {
        out = out.with_crs(Crs::new(crs));
    }
    Ok(out)
}

fn geometry_from_input(feature: FeatureInput) -> Result<Geometry<f64>> {
    let geometry = match feature {
        FeatureInput::Point { coordinates: [x, y] } => Geometry::Point(Point::new(x, y)),
        FeatureInput::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
            coordinates.into_iter().map(|[x, y]| Point::new(x, y)).collect(),
        )),
        FeatureInput::Line { coordinates } => Geometry::LineString(line_string(coordinates)),
        FeatureInput::MultiLine { coordinates } => Geometry::MultiLineString(MultiLineString::new(
            coordinates.into_iter().map(line_string).collect(),
        )),
        FeatureInput::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)?),
        FeatureInput::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon::new(
            coordinates
                .into_iter()
                .map(polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
    };
    Ok(geometry)
}

fn line_string(ring: Ring) -> LineString<f64> {
    LineString::new(ring.into_iter().map(|[x, y]| Coord { x, y }).collect())
}

fn polygon(rings: Vec<Ring>) -> Result<Polygon<f64>> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| anyhow::anyhow!("polygon needs an exterior ring"))?;
    Ok(Polygon::new(
        line_string(exterior),
        rings.map(line_string).collect(),
    ))
}

fn spec_from_input(input: SpecInput) -> Result<SubplotSpec> {
    let mut builder = if input.main {
        SubplotSpec::main()
    } else {
        SubplotSpec::inset()
    };
    if let Some(v) = input.xmin {
        builder = builder.xmin(v);
    }
    if let Some(v) = input.xmax {
        builder = builder.xmax(v);
    }
    if let Some(v) = input.ymin {
        builder = builder.ymin(v);
    }
    if let Some(v) = input.ymax {
        builder = builder.ymax(v);
    }
    if let Some(position) = input.position {
        builder = builder.position(position);
    }
    if let Some(v) = input.loc_left {
        builder = builder.loc_left(v);
    }
    if let Some(v) = input.loc_bottom {
        builder = builder.loc_bottom(v);
    }
    if let Some(v) = input.width {
        builder = builder.width(v);
    }
    if let Some(v) = input.height {
        builder = builder.height(v);
    }
    if let Some(v) = input.scale_factor {
        builder = builder.scale_factor(v);
    }
    match input.theme {
        Some(ThemeInput::Named(name)) => {
            let theme =
                Theme::by_name(&name).ok_or_else(|| anyhow::anyhow!("Unknown theme: {name}"))?;
            builder = builder.theme(theme);
        }
        Some(ThemeInput::Custom(theme)) => builder = builder.theme(theme),
        None => {}
    }
    Ok(builder.build()?)
}
