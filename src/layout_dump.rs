use crate::bbox::BoundingBox;
use crate::configuration::LayoutConfiguration;
use crate::layout::{ResolvedLayout, Resolution};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub full_ratio: f64,
    pub main_ratio: f64,
    pub margin: f64,
    pub crs: Option<String>,
    pub subplots: Vec<SubplotDump>,
}

#[derive(Debug, Serialize)]
pub struct SubplotDump {
    pub index: usize,
    pub is_main: bool,
    pub resolved_bbox: [f64; 4],
    pub data_extent: Option<[f64; 4]>,
    pub layout: Option<ResolvedLayout>,
    pub placeholder: bool,
}

fn bbox_array(b: &BoundingBox) -> [f64; 4] {
    [b.xmin, b.ymin, b.xmax, b.ymax]
}

impl LayoutDump {
    pub fn from_resolution(configuration: &LayoutConfiguration, resolution: &Resolution) -> Self {
        let subplots = configuration
            .subplots()
            .iter()
            .map(|subplot| {
                let placement = resolution
                    .placements
                    .iter()
                    .find(|p| p.index == subplot.index());
                let layout = if subplot.is_main() {
                    Some(ResolvedLayout::FULL)
                } else {
                    placement.map(|p| p.layout)
                };
                SubplotDump {
                    index: subplot.index(),
                    is_main: subplot.is_main(),
                    resolved_bbox: bbox_array(subplot.resolved_bbox()),
                    data_extent: subplot.data_extent().map(bbox_array),
                    layout,
                    placeholder: placement.is_some_and(|p| p.placeholder),
                }
            })
            .collect();

        LayoutDump {
            full_ratio: configuration.full_ratio(),
            main_ratio: configuration.main_ratio(),
            margin: configuration.margin(),
            crs: configuration.crs().map(|crs| crs.as_str().to_owned()),
            subplots,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    configuration: &LayoutConfiguration,
    resolution: &Resolution,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_resolution(configuration, resolution);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
