use crate::bbox::BoundingBox;
use crate::config::BorderStyle;
use crate::configuration::ResolvedSpec;
use crate::error::{InsetError, Result};
use crate::layout::ResolvedLayout;
use crate::spatial::Crs;
use crate::theme::Theme;
use geo_types::{Geometry, LineString, Polygon};
use std::path::Path;

/// Longer side of a rendered subplot's viewBox. Strokes and point radii are
/// expressed in this frame.
const NOMINAL_SIZE: f64 = 1000.0;

/// Draws subplots and stacks them into one artifact.
pub trait Renderer {
    type Artifact: Clone;

    /// Draw a subplot's cropped layers over its data extent.
    fn render(
        &self,
        theme: &Theme,
        subplot: &ResolvedSpec,
        crs: Option<&Crs>,
    ) -> Result<Self::Artifact>;

    /// Stand-in for a subplot whose crop came back empty.
    fn placeholder(&self, theme: &Theme, subplot: &ResolvedSpec) -> Result<Self::Artifact>;

    fn apply_border(&self, artifact: Self::Artifact, border: &BorderStyle) -> Self::Artifact;

    /// Lay insets over `base`, each at its normalized rectangle.
    fn place(
        &self,
        base: &Self::Artifact,
        insets: &[(Self::Artifact, ResolvedLayout)],
    ) -> Result<Self::Artifact>;

    /// Canvas width over height, when the renderer draws to a fixed canvas.
    fn canvas_ratio(&self) -> Option<f64> {
        None
    }
}

/// SVG content drawn in a `0 0 width height` viewBox.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgPlot {
    pub width: f64,
    pub height: f64,
    pub body: String,
}

impl SvgPlot {
    /// Standalone SVG document at the given pixel size.
    pub fn to_document(&self, width_px: f64, height_px: f64) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width_px:.0}\" height=\"{height_px:.0}\" viewBox=\"0 0 {:.3} {:.3}\">{}</svg>",
            self.width, self.height, self.body
        )
    }
}

/// Renders to SVG on a canvas of `width` x `height` pixels.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    pub width: f64,
    pub height: f64,
    pub background: String,
}

impl SvgRenderer {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }
}

impl Renderer for SvgRenderer {
    type Artifact = SvgPlot;

    fn canvas_ratio(&self) -> Option<f64> {
        Some(self.width / self.height)
    }

    fn render(
        &self,
        theme: &Theme,
        subplot: &ResolvedSpec,
        _crs: Option<&Crs>,
    ) -> Result<SvgPlot> {
        // Fails with the subplot's index when its crop is empty or degenerate.
        subplot.extent_features()?;
        let frame = Frame::new(subplot.data_extent().unwrap_or(subplot.resolved_bbox()));
        let mut body = String::new();
        body.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&theme.background)
        ));
        for layer in subplot.layers() {
            body.push_str(&format!("<g data-layer=\"{}\">", escape_xml(&layer.name)));
            for geometry in &layer.geometries {
                geometry_svg(geometry, &frame, theme, &mut body);
            }
            body.push_str("</g>");
        }
        Ok(SvgPlot {
            width: frame.width,
            height: frame.height,
            body,
        })
    }

    fn placeholder(&self, theme: &Theme, subplot: &ResolvedSpec) -> Result<SvgPlot> {
        let frame = Frame::new(subplot.resolved_bbox());
        let (w, h) = (frame.width, frame.height);
        let mut body = String::new();
        body.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&theme.placeholder_color)
        ));
        body.push_str(&format!(
            "<path d=\"M 0 0 L {w:.3} {h:.3} M {w:.3} 0 L 0 {h:.3}\" stroke=\"{}\" stroke-width=\"{}\" vector-effect=\"non-scaling-stroke\" fill=\"none\"/>",
            escape_xml(&theme.stroke),
            theme.stroke_width
        ));
        Ok(SvgPlot {
            width: w,
            height: h,
            body,
        })
    }

    fn apply_border(&self, artifact: SvgPlot, border: &BorderStyle) -> SvgPlot {
        let mut body = String::new();
        if let Some(fill) = &border.fill {
            body.push_str(&format!(
                "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
                escape_xml(fill)
            ));
        }
        body.push_str(&artifact.body);
        body.push_str(&format!(
            "<rect x=\"0\" y=\"0\" width=\"{:.3}\" height=\"{:.3}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" vector-effect=\"non-scaling-stroke\"/>",
            artifact.width,
            artifact.height,
            escape_xml(&border.color),
            border.width
        ));
        SvgPlot { body, ..artifact }
    }

    fn place(&self, base: &SvgPlot, insets: &[(SvgPlot, ResolvedLayout)]) -> Result<SvgPlot> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(InsetError::Render(format!(
                "canvas size {}x{} must be positive",
                self.width, self.height
            )));
        }
        let (cw, ch) = (self.width, self.height);
        let mut body = String::new();
        body.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&self.background)
        ));
        nested_svg(&mut body, base, 0.0, 0.0, cw, ch, "xMidYMid meet");
        for (artifact, layout) in insets {
            // Layouts are anchored bottom-left; SVG's origin is top-left.
            let x = layout.x * cw;
            let y = (1.0 - layout.y - layout.height) * ch;
            nested_svg(
                &mut body,
                artifact,
                x,
                y,
                layout.width * cw,
                layout.height * ch,
                "none",
            );
        }
        Ok(SvgPlot {
            width: cw,
            height: ch,
            body,
        })
    }
}

fn nested_svg(out: &mut String, plot: &SvgPlot, x: f64, y: f64, w: f64, h: f64, aspect: &str) {
    out.push_str(&format!(
        "<svg x=\"{x:.3}\" y=\"{y:.3}\" width=\"{w:.3}\" height=\"{h:.3}\" viewBox=\"0 0 {:.3} {:.3}\" preserveAspectRatio=\"{aspect}\" overflow=\"hidden\">{}</svg>",
        plot.width, plot.height, plot.body
    ));
}

/// Maps data coordinates into the nominal viewBox, flipping y.
struct Frame {
    xmin: f64,
    ymax: f64,
    scale: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn new(extent: &BoundingBox) -> Self {
        let longest = extent.x_range().max(extent.y_range());
        let scale = if longest > 0.0 {
            NOMINAL_SIZE / longest
        } else {
            1.0
        };
        Self {
            xmin: extent.xmin,
            ymax: extent.ymax,
            scale,
            width: (extent.x_range() * scale).max(1.0),
            height: (extent.y_range() * scale).max(1.0),
        }
    }

    fn map(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.xmin) * self.scale, (self.ymax - y) * self.scale)
    }
}

fn geometry_svg(geometry: &Geometry<f64>, frame: &Frame, theme: &Theme, out: &mut String) {
    match geometry {
        Geometry::Point(p) => point_svg(p.x(), p.y(), frame, theme, out),
        Geometry::MultiPoint(mp) => {
            for p in mp.iter() {
                point_svg(p.x(), p.y(), frame, theme, out);
            }
        }
        Geometry::Line(line) => {
            let ls = LineString::from(vec![line.start, line.end]);
            line_svg(&ls, frame, theme, out);
        }
        Geometry::LineString(ls) => line_svg(ls, frame, theme, out),
        Geometry::MultiLineString(mls) => {
            for ls in mls.iter() {
                line_svg(ls, frame, theme, out);
            }
        }
        Geometry::Polygon(poly) => polygon_svg(poly, frame, theme, out),
        Geometry::MultiPolygon(mp) => {
            for poly in mp.iter() {
                polygon_svg(poly, frame, theme, out);
            }
        }
        Geometry::Rect(rect) => polygon_svg(&rect.to_polygon(), frame, theme, out),
        Geometry::Triangle(tri) => polygon_svg(&tri.to_polygon(), frame, theme, out),
        Geometry::GeometryCollection(collection) => {
            for inner in collection.iter() {
                geometry_svg(inner, frame, theme, out);
            }
        }
    }
}

fn point_svg(x: f64, y: f64, frame: &Frame, theme: &Theme, out: &mut String) {
    let (cx, cy) = frame.map(x, y);
    out.push_str(&format!(
        "<circle cx=\"{cx:.3}\" cy=\"{cy:.3}\" r=\"{}\" fill=\"{}\"/>",
        theme.point_radius,
        escape_xml(&theme.point_color)
    ));
}

fn line_svg(ls: &LineString<f64>, frame: &Frame, theme: &Theme, out: &mut String) {
    let d = ring_path(ls, frame, false);
    if d.is_empty() {
        return;
    }
    out.push_str(&format!(
        "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" vector-effect=\"non-scaling-stroke\"/>",
        escape_xml(&theme.line_color),
        theme.line_width
    ));
}

fn polygon_svg(poly: &Polygon<f64>, frame: &Frame, theme: &Theme, out: &mut String) {
    let mut d = ring_path(poly.exterior(), frame, true);
    for interior in poly.interiors() {
        let ring = ring_path(interior, frame, true);
        if !ring.is_empty() {
            d.push(' ');
            d.push_str(&ring);
        }
    }
    if d.is_empty() {
        return;
    }
    out.push_str(&format!(
        "<path d=\"{d}\" fill=\"{}\" fill-opacity=\"{}\" fill-rule=\"evenodd\" stroke=\"{}\" stroke-width=\"{}\" vector-effect=\"non-scaling-stroke\"/>",
        escape_xml(&theme.fill),
        theme.fill_opacity,
        escape_xml(&theme.stroke),
        theme.stroke_width
    ));
}

fn ring_path(ls: &LineString<f64>, frame: &Frame, close: bool) -> String {
    let mut d = String::new();
    for (idx, coord) in ls.coords().enumerate() {
        let (x, y) = frame.map(coord.x, coord.y);
        let op = if idx == 0 { 'M' } else { 'L' };
        if idx > 0 {
            d.push(' ');
        }
        d.push_str(&format!("{op} {x:.3} {y:.3}"));
    }
    if close && !d.is_empty() {
        d.push_str(" Z");
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path) -> anyhow::Result<()> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConfigurationBuilder;
    use crate::spatial::{FeatureLayer, IdentityProjector};
    use crate::spec::SubplotSpec;
    use geo_types::{point, polygon};

    fn configuration() -> crate::configuration::LayoutConfiguration {
        let layer = FeatureLayer::new(
            "land",
            vec![
                Geometry::Polygon(polygon![
                    (x: 0.0, y: 0.0),
                    (x: 4.0, y: 0.0),
                    (x: 4.0, y: 2.0),
                    (x: 0.0, y: 2.0),
                ]),
                Geometry::Point(point!(x: 1.0, y: 1.0)),
            ],
        );
        ConfigurationBuilder::new(vec![layer])
            .spec(SubplotSpec::main().build().unwrap())
            .spec(
                SubplotSpec::inset()
                    .bbox(BoundingBox::new(10.0, 10.0, 12.0, 11.0))
                    .width(0.2)
                    .build()
                    .unwrap(),
            )
            .resolve(&IdentityProjector)
            .unwrap()
    }

    #[test]
    fn renders_layers_in_data_frame() {
        let config = configuration();
        let plot = SvgRenderer::new(800.0, 400.0)
            .render(&Theme::classic(), config.main(), None)
            .unwrap();
        assert!((plot.width - 1000.0).abs() < 1e-3);
        assert!((plot.height - 500.0).abs() < 1e-3);
        assert!(plot.body.contains("<path"));
        assert!(plot.body.contains("<circle"));
        assert!(plot.body.contains("data-layer=\"land\""));
    }

    #[test]
    fn empty_subplot_fails_render_but_has_placeholder() {
        let config = configuration();
        let renderer = SvgRenderer::new(800.0, 400.0);
        let inset = &config.subplots()[1];
        assert!(renderer.render(&Theme::classic(), inset, None).is_err());
        let placeholder = renderer.placeholder(&Theme::classic(), inset).unwrap();
        assert!((placeholder.width / placeholder.height - 2.0).abs() < 1e-9);
    }

    #[test]
    fn border_wraps_body() {
        let plot = SvgPlot {
            width: 10.0,
            height: 5.0,
            body: "<g/>".to_string(),
        };
        let framed = SvgRenderer::new(100.0, 100.0).apply_border(plot, &BorderStyle::default());
        assert!(framed.body.contains("<g/>"));
        assert!(framed.body.ends_with("vector-effect=\"non-scaling-stroke\"/>"));
        assert_eq!((framed.width, framed.height), (10.0, 5.0));
    }

    #[test]
    fn place_flips_to_top_left_origin() {
        let base = SvgPlot {
            width: 10.0,
            height: 10.0,
            body: String::new(),
        };
        let inset = ResolvedLayout {
            x: 0.1,
            y: 0.2,
            width: 0.3,
            height: 0.4,
        };
        let composed = SvgRenderer::new(200.0, 100.0)
            .place(&base, &[(base.clone(), inset)])
            .unwrap();
        assert!(composed.body.contains("<svg x=\"20.000\" y=\"40.000\" width=\"60.000\" height=\"40.000\""));
        let doc = composed.to_document(200.0, 100.0);
        assert!(doc.starts_with("<svg xmlns"));
        assert!(doc.ends_with("</svg>"));
    }
}
