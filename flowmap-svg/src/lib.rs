use flowmap_core::scene::{
    DepartmentShape, EDGE_STROKE_WIDTH, EdgeShape, LABEL_FONT_FAMILY, LABEL_FONT_SIZE,
    MARKER_SIZE, POLYGON_FILL, POLYGON_STROKE, POLYGON_STROKE_WIDTH,
};
use flowmap_core::{Rgb, Scene, SceneSink, Viewport, ZoomTransform};
use png::{BitDepth, ColorType, Encoder};
use tracing::debug;

pub mod markup;

pub const SVG_ID: &str = "flow_svg";
pub const VIEWPORT_GROUP_ID: &str = "flow_viewport";
pub const ARROW_MARKER_ID: &str = "triangle";

pub fn encode_rgba_to_png_bytes(
    width: u32,
    height: u32,
    rgba: &[u8],
) -> Result<Vec<u8>, png::EncodingError> {
    let mut buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut buf, width, height);
        enc.set_color(ColorType::Rgba);
        enc.set_depth(BitDepth::Eight);
        {
            let mut writer = enc.write_header()?;
            writer.write_image_data(rgba)?;
        }
        // enc drops here, releasing the &mut buf borrow
    }
    Ok(buf)
}

pub fn svg_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Builds an SVG document from scene drawing calls.
///
/// Element ids and `data-*` attributes are what the browser viewer hooks
/// its hover and zoom handlers onto, so they are part of the output format.
#[derive(Debug, Default)]
pub struct SvgSink {
    out: String,
    transform: Option<ZoomTransform>,
    background: Option<&'static str>,
}

impl SvgSink {
    pub fn new() -> Self {
        SvgSink::default()
    }

    /// Bake a pan/zoom transform into the viewport group.
    pub fn with_transform(mut self, t: ZoomTransform) -> Self {
        self.transform = Some(t);
        self
    }

    /// Paint an opaque background; standalone images need one.
    pub fn with_background(mut self, color: &'static str) -> Self {
        self.background = Some(color);
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl SceneSink for SvgSink {
    fn begin(&mut self, viewport: Viewport, view_box: (f64, f64)) {
        let s = &mut self.out;
        s.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" id=\"{}\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {:.2} {:.2}\">\n",
            SVG_ID, viewport.width, viewport.height, view_box.0, view_box.1
        ));
        s.push_str(&format!(
            "<defs><marker id=\"{}\" refX=\"12\" refY=\"2\" markerWidth=\"5\" markerHeight=\"5\" orient=\"auto\"><path d=\"M0,0 L0,4 L4,2 z\" fill=\"black\"/></marker></defs>\n",
            ARROW_MARKER_ID
        ));
        if let Some(bg) = self.background {
            s.push_str(&format!(
                "<rect x=\"0\" y=\"0\" width=\"100%\" height=\"100%\" fill=\"{bg}\"/>\n"
            ));
        }
        match self.transform {
            Some(t) => s.push_str(&format!(
                "<g id=\"{}\" transform=\"{}\">\n",
                VIEWPORT_GROUP_ID, t
            )),
            None => s.push_str(&format!("<g id=\"{}\">\n", VIEWPORT_GROUP_ID)),
        }
    }

    fn polygon(&mut self, dept: &DepartmentShape) {
        let points: Vec<String> = dept
            .outline
            .iter()
            .map(|p| format!("{:.2},{:.2}", p.x, p.y))
            .collect();
        self.out.push_str(&format!(
            "<polygon class=\"department\" data-dept=\"{}\" points=\"{}\" stroke=\"{}\" stroke-width=\"{}\" fill=\"{}\" pointer-events=\"all\"/>\n",
            svg_escape(&dept.id),
            points.join(" "),
            POLYGON_STROKE,
            POLYGON_STROKE_WIDTH,
            POLYGON_FILL
        ));
    }

    fn edge(&mut self, edge: &EdgeShape) {
        self.out.push_str(&format!(
            "<line id=\"{}\" class=\"arrow\" data-edge=\"{}\" data-src=\"{}\" data-dest=\"{}\" data-offset=\"{}\" x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{}\" marker-end=\"url(#{})\"><title>{}</title></line>\n",
            edge.element_id,
            edge.edge,
            svg_escape(&edge.source),
            svg_escape(&edge.destination),
            edge.offset.pixels(),
            edge.from.x,
            edge.from.y,
            edge.to.x,
            edge.to.y,
            edge.stroke,
            EDGE_STROKE_WIDTH,
            ARROW_MARKER_ID,
            svg_escape(&edge.info)
        ));
    }

    fn marker(&mut self, dept: &DepartmentShape, fill: Rgb) {
        let half = MARKER_SIZE / 2.0;
        self.out.push_str(&format!(
            "<rect id=\"{}\" class=\"dept-marker\" x=\"{:.2}\" y=\"{:.2}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>\n",
            dept.element_id,
            dept.anchor.x - half,
            dept.anchor.y - half,
            MARKER_SIZE,
            MARKER_SIZE,
            fill
        ));
    }

    fn label(&mut self, dept: &DepartmentShape) {
        self.out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" dy=\"-.85em\" fill=\"{}\" font-size=\"{}px\" font-family=\"{}\" text-anchor=\"middle\">{}</text>\n",
            dept.anchor.x,
            dept.anchor.y,
            POLYGON_STROKE,
            LABEL_FONT_SIZE,
            LABEL_FONT_FAMILY,
            svg_escape(&dept.id)
        ));
    }

    fn end(&mut self) {
        self.out.push_str("</g>\n</svg>\n");
    }
}

pub fn render_svg(scene: &Scene) -> String {
    let mut sink = SvgSink::new();
    scene.draw(&mut sink);
    let svg = sink.finish();
    debug!(bytes = svg.len(), "svg rendered");
    svg
}

/// Standalone document for download or rasterizing: XML prolog, white
/// background and the current zoom baked in.
pub fn render_standalone_svg(scene: &Scene, transform: ZoomTransform) -> String {
    let mut sink = SvgSink::new()
        .with_background("#ffffff")
        .with_transform(transform);
    scene.draw(&mut sink);
    let mut s = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    s.push_str(&sink.finish());
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmap_core::{EdgeRecord, FacilityRecord, Payload, Point, ViewerConfig, build_scene};
    use rstest::rstest;

    fn scene() -> Scene {
        let square = |x: f64| FacilityRecord {
            boundaries: vec![
                Point { x, y: 0.0 },
                Point { x: x + 10.0, y: 0.0 },
                Point { x: x + 10.0, y: 10.0 },
                Point { x, y: 10.0 },
            ],
            centroid: Point { x: x + 5.0, y: 5.0 },
        };
        let mut p = Payload::default();
        p.facility.insert("A&1".into(), square(0.0));
        p.facility.insert("B".into(), square(20.0));
        p.edges = vec![EdgeRecord::new("A&1", "B", 4, 2).with_metrics(10.0, 30.0)];
        build_scene(
            &p,
            Viewport {
                width: 600.0,
                height: 400.0,
            },
            &ViewerConfig::default(),
        )
    }

    #[test]
    fn document_structure() {
        let svg = render_svg(&scene());
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" id=\"flow_svg\" width=\"600\" height=\"400\""));
        assert!(svg.contains("<marker id=\"triangle\" refX=\"12\" refY=\"2\""));
        assert!(svg.contains("<g id=\"flow_viewport\">"));
        assert!(svg.trim_end().ends_with("</g>\n</svg>"));
        assert_eq!(svg.matches("<polygon ").count(), 2);
        assert_eq!(svg.matches("<line ").count(), 1);
        assert_eq!(svg.matches("class=\"dept-marker\"").count(), 2);
        assert_eq!(svg.matches("<text ").count(), 2);
    }

    #[test]
    fn edges_carry_hover_hooks() {
        let svg = render_svg(&scene());
        assert!(svg.contains("id=\"edge-0\" class=\"arrow\" data-edge=\"0\" data-src=\"A&amp;1\" data-dest=\"B\" data-offset=\"-2\""));
        assert!(svg.contains("stroke=\"rgb("));
        assert!(svg.contains("marker-end=\"url(#triangle)\""));
        assert!(svg.contains("<title>A&amp;1 - B: Quantity: 4, Times: 2, Distance: 10 m, Transportation Time: 0 min 30 sec</title>"));
    }

    #[test]
    fn markers_follow_highlight_state() {
        let mut s = scene();
        s.highlight(0);
        let svg = render_svg(&s);
        assert_eq!(svg.matches("fill=\"rgb(0, 0, 255)\"").count(), 2);
        s.restore(0);
        let svg = render_svg(&s);
        assert_eq!(svg.matches("fill=\"rgb(68, 68, 68)\"").count(), 2);
    }

    #[test]
    fn standalone_bakes_zoom() {
        let t = ZoomTransform {
            k: 2.0,
            x: -10.0,
            y: -5.0,
        };
        let svg = render_standalone_svg(&scene(), t);
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("fill=\"#ffffff\""));
        assert!(svg.contains("<g id=\"flow_viewport\" transform=\"translate(-10,-5) scale(2)\">"));
    }

    #[rstest]
    #[case("A&B", "A&amp;B")]
    #[case("<Lager>", "&lt;Lager&gt;")]
    #[case("say \"hi\"", "say &quot;hi&quot;")]
    #[case("Montage 2", "Montage 2")]
    fn escapes_markup(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(svg_escape(raw), expected);
    }

    #[test]
    fn png_header_is_written() {
        let bytes = encode_rgba_to_png_bytes(2, 1, &[0u8; 8]).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
