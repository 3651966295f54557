//! Diagram composition: projected department outlines, centroid markers,
//! labels and directed edges, plus the hover index that ties edges to their
//! endpoint markers.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::color::{Rgb, volume_color};
use crate::config::ViewerConfig;
use crate::layout::{EdgeOffset, resolve_offsets};
use crate::model::{Payload, Point};
use crate::projector::{CoordinateProjector, Viewport};
use crate::summary::format_trip_time;

pub const POLYGON_STROKE: &str = "#444444";
pub const POLYGON_STROKE_WIDTH: f64 = 5.0;
pub const POLYGON_FILL: &str = "#dbe9ee";
pub const MARKER_SIZE: f64 = 12.0;
pub const EDGE_STROKE_WIDTH: f64 = 3.5;
pub const LABEL_FONT_SIZE: f64 = 15.0;
pub const LABEL_FONT_FAMILY: &str = "Lato, sans-serif";
pub const HIGHLIGHT: Rgb = Rgb::BLUE;

#[derive(Clone, Debug, PartialEq)]
pub struct DepartmentShape {
    pub id: String,
    pub element_id: String,
    pub outline: Vec<Point>,
    pub anchor: Point,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeShape {
    /// Position of the edge in the payload.
    pub edge: usize,
    pub element_id: String,
    pub source: String,
    pub destination: String,
    pub from: Point,
    pub to: Point,
    pub offset: EdgeOffset,
    pub stroke: Rgb,
    pub quantity: u64,
    pub info: String,
}

/// Receiver for the drawing calls a scene makes, in paint order.
pub trait SceneSink {
    fn begin(&mut self, viewport: Viewport, view_box: (f64, f64));
    fn polygon(&mut self, dept: &DepartmentShape);
    fn edge(&mut self, edge: &EdgeShape);
    fn marker(&mut self, dept: &DepartmentShape, fill: Rgb);
    fn label(&mut self, dept: &DepartmentShape);
    fn end(&mut self);
}

/// Attribute rewrite for one diagram element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleChange {
    pub element_id: String,
    pub attribute: &'static str,
    pub value: String,
}

impl StyleChange {
    fn fill(element_id: &str, color: Rgb) -> Self {
        StyleChange {
            element_id: element_id.to_string(),
            attribute: "fill",
            value: color.to_string(),
        }
    }

    fn stroke(element_id: &str, color: Rgb) -> Self {
        StyleChange {
            element_id: element_id.to_string(),
            attribute: "stroke",
            value: color.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct EdgeSlot {
    shape: Option<usize>,
    endpoints: Option<(usize, usize)>,
    saved_stroke: Option<Rgb>,
}

/// Edge <-> department lookups built once per scene. Each edge keeps the
/// stroke it had before it was highlighted. A marker is lit while any of its
/// department's edges is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoverIndex {
    by_department: HashMap<String, Vec<usize>>,
    departments: HashMap<String, usize>,
    edges: Vec<EdgeSlot>,
}

impl HoverIndex {
    /// Edges (payload positions) starting or ending at a department.
    pub fn edges_of(&self, department: &str) -> &[usize] {
        self.by_department
            .get(department)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn department_index(&self, department: &str) -> Option<usize> {
        self.departments.get(department).copied()
    }

    pub fn is_highlighted(&self, edge: usize) -> bool {
        self.edges
            .get(edge)
            .is_some_and(|slot| slot.saved_stroke.is_some())
    }

    pub fn is_department_lit(&self, department: &str) -> bool {
        self.edges_of(department)
            .iter()
            .any(|&e| self.is_highlighted(e))
    }
}

/// Everything needed to draw one payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub viewport: Viewport,
    pub view_box: (f64, f64),
    pub departments: Vec<DepartmentShape>,
    pub edges: Vec<EdgeShape>,
    hover: HoverIndex,
}

fn department_element_id(i: usize) -> String {
    format!("dept-{i}")
}

pub fn edge_element_id(edge: usize) -> String {
    format!("edge-{edge}")
}

/// Build the scene for a payload. Self-edges and edges whose endpoints have
/// no outline are left out of the drawing but keep their payload index.
pub fn build_scene(payload: &Payload, viewport: Viewport, config: &ViewerConfig) -> Scene {
    let (ex, ey) = payload.extents();
    let projector = CoordinateProjector::build(ex, ey, viewport, config.margin_fraction());
    payload.log_geometry_issues();

    let mut hover = HoverIndex::default();
    let mut departments = Vec::with_capacity(payload.facility.len());
    for (i, (id, rec)) in payload.facility.iter().enumerate() {
        departments.push(DepartmentShape {
            id: id.clone(),
            element_id: department_element_id(i),
            outline: rec.boundaries.iter().map(|p| projector.place(*p)).collect(),
            anchor: projector.place(rec.centroid),
        });
        hover.departments.insert(id.clone(), i);
    }

    let offsets = resolve_offsets(&payload.edges);
    let max_q = payload.max_quantity();
    let mut edges = Vec::with_capacity(payload.edges.len());
    hover.edges = vec![EdgeSlot::default(); payload.edges.len()];
    for (i, e) in payload.edges.iter().enumerate() {
        let (Some(si), Some(di)) = (
            hover.department_index(&e.source),
            hover.department_index(&e.destination),
        ) else {
            warn!(source = %e.source, destination = %e.destination, "edge endpoint has no outline, not drawn");
            continue;
        };
        hover.edges[i].endpoints = Some((si, di));
        hover
            .by_department
            .entry(e.source.clone())
            .or_default()
            .push(i);
        if e.is_self_edge() {
            debug!(department = %e.source, quantity = e.quantity, "self-edge kept out of diagram");
            continue;
        }
        hover
            .by_department
            .entry(e.destination.clone())
            .or_default()
            .push(i);

        let shift = offsets[i].pixels();
        let nudge = |p: Point| Point {
            x: p.x + shift,
            y: p.y + shift,
        };
        let distance = e.metrics.distance_or_zero();
        let info = format!(
            "{} - {}: Quantity: {}, Times: {}, Distance: {} m, Transportation Time: {}",
            e.source,
            e.destination,
            e.quantity,
            e.trip_count,
            distance,
            format_trip_time(e.metrics.known_time())
        );
        hover.edges[i].shape = Some(edges.len());
        edges.push(EdgeShape {
            edge: i,
            element_id: edge_element_id(i),
            source: e.source.clone(),
            destination: e.destination.clone(),
            from: nudge(departments[si].anchor),
            to: nudge(departments[di].anchor),
            offset: offsets[i],
            stroke: volume_color(e.quantity, max_q),
            quantity: e.quantity,
            info,
        });
    }
    debug!(
        departments = departments.len(),
        edges = edges.len(),
        "scene built"
    );

    Scene {
        viewport,
        view_box: projector.view_box(),
        departments,
        edges,
        hover,
    }
}

impl Scene {
    /// Replay the scene into a sink: outlines, then edges, then markers and
    /// labels on top.
    pub fn draw<S: SceneSink>(&self, sink: &mut S) {
        sink.begin(self.viewport, self.view_box);
        for d in &self.departments {
            sink.polygon(d);
        }
        for e in &self.edges {
            sink.edge(e);
        }
        for d in &self.departments {
            let fill = if self.hover.is_department_lit(&d.id) {
                HIGHLIGHT
            } else {
                Rgb::MARKER
            };
            sink.marker(d, fill);
            sink.label(d);
        }
        sink.end();
    }

    pub fn hover_index(&self) -> &HoverIndex {
        &self.hover
    }

    /// Drawn shape for a payload edge, if it made it into the diagram.
    pub fn edge_shape(&self, edge: usize) -> Option<&EdgeShape> {
        let slot = self.hover.edges.get(edge)?;
        slot.shape.map(|s| &self.edges[s])
    }

    /// Highlight an edge and both its endpoint markers. Hovering an edge
    /// that is already lit changes nothing.
    pub fn highlight(&mut self, edge: usize) -> Vec<StyleChange> {
        let mut changes = Vec::new();
        let Some(slot) = self.hover.edges.get(edge).cloned() else {
            return changes;
        };
        if slot.saved_stroke.is_some() {
            return changes;
        }
        let Some((si, di)) = slot.endpoints else {
            return changes;
        };
        let current = slot
            .shape
            .map(|s| self.edges[s].stroke)
            .unwrap_or(Rgb::MARKER);
        let ends = dedup(si, di);
        let dark: Vec<usize> = ends
            .into_iter()
            .filter(|&d| !self.hover.is_department_lit(&self.departments[d].id))
            .collect();
        self.hover.edges[edge].saved_stroke = Some(current);
        for dept in dark {
            changes.push(StyleChange::fill(
                &self.departments[dept].element_id,
                HIGHLIGHT,
            ));
        }
        if let Some(s) = slot.shape {
            changes.push(StyleChange::stroke(&self.edges[s].element_id, HIGHLIGHT));
        }
        changes
    }

    /// Undo `highlight`: the edge gets its own saved stroke back, a marker
    /// goes back to its normal fill once no lit edge touches it.
    pub fn restore(&mut self, edge: usize) -> Vec<StyleChange> {
        let mut changes = Vec::new();
        let Some(slot) = self.hover.edges.get(edge).cloned() else {
            return changes;
        };
        let Some(saved) = slot.saved_stroke else {
            return changes;
        };
        self.hover.edges[edge].saved_stroke = None;
        if let Some((si, di)) = slot.endpoints {
            for dept in dedup(si, di) {
                if !self.hover.is_department_lit(&self.departments[dept].id) {
                    changes.push(StyleChange::fill(
                        &self.departments[dept].element_id,
                        Rgb::MARKER,
                    ));
                }
            }
        }
        if let Some(s) = slot.shape {
            changes.push(StyleChange::stroke(&self.edges[s].element_id, saved));
        }
        changes
    }
}

fn dedup(a: usize, b: usize) -> Vec<usize> {
    if a == b { vec![a] } else { vec![a, b] }
}
