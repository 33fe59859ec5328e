//! Spatial data plumbing: layers of `geo-types` geometries, their bounds,
//! cropping to a box, and the reprojection seam.

use std::fmt;

use geo::{BooleanOps, BoundingRect};
use geo_types::{Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::bbox::{self, BoundingBox};
use crate::error::{InsetError, Result};

/// Opaque coordinate reference system identifier, e.g. `EPSG:4326`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayer {
    pub name: String,
    pub crs: Option<Crs>,
    pub geometries: Vec<Geometry<f64>>,
}

impl FeatureLayer {
    pub fn new(name: impl Into<String>, geometries: Vec<Geometry<f64>>) -> Self {
        Self {
            name: name.into(),
            crs: None,
            geometries,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Bounding box of every geometry in the layer, `None` when empty.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.geometries
            .iter()
            .filter_map(|g| g.bounding_rect())
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
            .reduce(|a, b| a.merged(&b))
    }

    /// Keep only the parts of the layer that fall inside `bbox`.
    pub fn crop(&self, bbox: &BoundingBox) -> FeatureLayer {
        let window = geo_types::Rect::new(
            geo_types::coord! { x: bbox.xmin, y: bbox.ymin },
            geo_types::coord! { x: bbox.xmax, y: bbox.ymax },
        )
        .to_polygon();
        let mut geometries = Vec::new();
        for geometry in &self.geometries {
            crop_geometry(geometry, bbox, &window, &mut geometries);
        }
        FeatureLayer {
            name: self.name.clone(),
            crs: self.crs.clone(),
            geometries,
        }
    }
}

/// Union of the bounds of every non-empty layer.
pub fn collection_bounds(layers: &[FeatureLayer]) -> Result<BoundingBox> {
    let boxes: Vec<BoundingBox> = layers.iter().filter_map(FeatureLayer::bounds).collect();
    bbox::union(&boxes)
}

/// Union of the bounds of every non-empty layer, `None` when nothing is left.
pub fn cropped_extent(layers: &[FeatureLayer]) -> Option<BoundingBox> {
    collection_bounds(layers).ok()
}

/// Moves layers between coordinate systems. The math lives outside this crate.
pub trait Projector {
    fn reproject(&self, layer: FeatureLayer, target: &Crs) -> Result<FeatureLayer>;
}

/// Accepts layers already in the target system, or with no system declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjector;

impl Projector for IdentityProjector {
    fn reproject(&self, mut layer: FeatureLayer, target: &Crs) -> Result<FeatureLayer> {
        match &layer.crs {
            Some(crs) if crs != target => Err(InsetError::Projection {
                layer: layer.name.clone(),
                from: crs.to_string(),
                to: target.to_string(),
            }),
            _ => {
                layer.crs = Some(target.clone());
                Ok(layer)
            }
        }
    }
}

fn crop_geometry(
    geometry: &Geometry<f64>,
    bbox: &BoundingBox,
    window: &Polygon<f64>,
    out: &mut Vec<Geometry<f64>>,
) {
    match geometry {
        Geometry::Point(p) => {
            if bbox.contains(p.x(), p.y()) {
                out.push(Geometry::Point(*p));
            }
        }
        Geometry::MultiPoint(mp) => {
            let kept: Vec<Point<f64>> = mp
                .iter()
                .filter(|p| bbox.contains(p.x(), p.y()))
                .copied()
                .collect();
            if !kept.is_empty() {
                out.push(Geometry::MultiPoint(MultiPoint::new(kept)));
            }
        }
        Geometry::Line(line) => {
            let ls = LineString::from(vec![line.start, line.end]);
            push_lines(window.clip(&MultiLineString::new(vec![ls]), false), out);
        }
        Geometry::LineString(ls) => {
            push_lines(window.clip(&MultiLineString::new(vec![ls.clone()]), false), out);
        }
        Geometry::MultiLineString(mls) => push_lines(window.clip(mls, false), out),
        Geometry::Polygon(poly) => push_polygons(window.intersection(poly), out),
        Geometry::MultiPolygon(mp) => push_polygons(window.intersection(mp), out),
        Geometry::Rect(rect) => push_polygons(window.intersection(&rect.to_polygon()), out),
        Geometry::Triangle(tri) => push_polygons(window.intersection(&tri.to_polygon()), out),
        Geometry::GeometryCollection(collection) => {
            for inner in collection.iter() {
                crop_geometry(inner, bbox, window, out);
            }
        }
    }
}

fn push_lines(clipped: MultiLineString<f64>, out: &mut Vec<Geometry<f64>>) {
    let lines: Vec<LineString<f64>> = clipped.into_iter().filter(|ls| ls.0.len() >= 2).collect();
    match lines.len() {
        0 => {}
        1 => out.extend(lines.into_iter().map(Geometry::LineString)),
        _ => out.push(Geometry::MultiLineString(MultiLineString::new(lines))),
    }
}

fn push_polygons(clipped: MultiPolygon<f64>, out: &mut Vec<Geometry<f64>>) {
    match clipped.0.len() {
        0 => {}
        1 => out.extend(clipped.0.into_iter().map(Geometry::Polygon)),
        _ => out.push(Geometry::MultiPolygon(clipped)),
    }
}
