use std::collections::BTreeMap;

use geo::{BoundingRect, Contains};
use geo_types::{LineString, Polygon};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::LoadError;

/// Prefix marking a synthetic node that stands for flow leaving or entering
/// the modeled facility.
pub const DUMMY_PREFIX: &str = "DUMMY";

/// Basic two dimensional point in facility units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<(f64, f64)> for Point {
    fn from(v: (f64, f64)) -> Self {
        Point { x: v.0, y: v.1 }
    }
}

impl From<[f64; 2]> for Point {
    fn from(v: [f64; 2]) -> Self {
        Point { x: v[0], y: v[1] }
    }
}

/// Strip the dotted suffix from a department identifier (`"B12.3"` -> `"B12"`).
pub fn department_id(raw: &str) -> &str {
    raw.split('.').next().unwrap_or(raw)
}

pub fn is_dummy(id: &str) -> bool {
    id.starts_with(DUMMY_PREFIX)
}

#[derive(Clone, Debug, Default, Deserialize)]
struct CentroidPoints {
    centroid: Option<[f64; 2]>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawFacility {
    #[serde(default)]
    boundaries: Vec<[f64; 2]>,
    // the service nests the centroid under "points"
    #[serde(default)]
    points: Option<CentroidPoints>,
    #[serde(default)]
    centroid: Option<[f64; 2]>,
}

/// Polygonal outline of one department plus its label anchor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FacilityRecord {
    pub boundaries: Vec<Point>,
    pub centroid: Point,
}

impl From<RawFacility> for FacilityRecord {
    fn from(raw: RawFacility) -> Self {
        let boundaries: Vec<Point> = raw.boundaries.into_iter().map(Point::from).collect();
        let centroid = raw
            .centroid
            .or_else(|| raw.points.and_then(|p| p.centroid))
            .map(Point::from)
            .unwrap_or_else(|| vertex_mean(&boundaries));
        FacilityRecord {
            boundaries,
            centroid,
        }
    }
}

impl<'de> Deserialize<'de> for FacilityRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawFacility::deserialize(deserializer).map(FacilityRecord::from)
    }
}

fn vertex_mean(pts: &[Point]) -> Point {
    let n = pts.len().max(1) as f64;
    let sum = pts.iter().fold(Point { x: 0.0, y: 0.0 }, |acc, q| Point {
        x: acc.x + q.x,
        y: acc.y + q.y,
    });
    Point {
        x: sum.x / n,
        y: sum.y / n,
    }
}

/// Problems found in a department outline. None of them stop rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeometryIssue {
    TooFewPoints(usize),
    CentroidOutside,
}

impl FacilityRecord {
    /// Check the outline invariants: at least three points, and a centroid
    /// inside the polygon or within its bounding box.
    pub fn validate(&self) -> Vec<GeometryIssue> {
        let mut issues = Vec::new();
        if self.boundaries.len() < 3 {
            issues.push(GeometryIssue::TooFewPoints(self.boundaries.len()));
            return issues;
        }
        let ring: LineString<f64> = self
            .boundaries
            .iter()
            .map(|p| (p.x, p.y))
            .collect::<Vec<_>>()
            .into();
        let polygon = Polygon::new(ring, vec![]);
        let c = geo_types::Point::new(self.centroid.x, self.centroid.y);
        if !polygon.contains(&c) {
            let near = polygon.bounding_rect().is_some_and(|r| {
                let (lo, hi) = (r.min(), r.max());
                c.x() >= lo.x && c.x() <= hi.x && c.y() >= lo.y && c.y() <= hi.y
            });
            if !near {
                issues.push(GeometryIssue::CentroidOutside);
            }
        }
        issues
    }
}

/// Per-trip metrics. The service omits the `distance` key when nothing is
/// known about the route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetrics {
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub time: Option<f64>,
}

impl EdgeMetrics {
    /// Distance per trip in meters, 0 when unknown.
    pub fn distance_or_zero(&self) -> f64 {
        self.distance.filter(|d| d.is_finite()).unwrap_or(0.0)
    }

    /// Seconds per trip, `None` when the route is unknown.
    pub fn known_time(&self) -> Option<f64> {
        self.distance?;
        self.time.filter(|t| t.is_finite())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawEdge {
    Full(String, String, u64, u64, EdgeMetrics),
    Bare(String, String, u64, u64),
    Named {
        source: String,
        destination: String,
        quantity: u64,
        #[serde(alias = "tripCount")]
        trip_count: u64,
        #[serde(default)]
        metrics: EdgeMetrics,
    },
}

/// Aggregated transport flow between two departments inside the active
/// time window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EdgeRecord {
    pub source: String,
    pub destination: String,
    pub quantity: u64,
    pub trip_count: u64,
    pub metrics: EdgeMetrics,
}

impl From<RawEdge> for EdgeRecord {
    fn from(raw: RawEdge) -> Self {
        let (source, destination, quantity, trip_count, metrics) = match raw {
            RawEdge::Full(s, d, q, t, m) => (s, d, q, t, m),
            RawEdge::Bare(s, d, q, t) => (s, d, q, t, EdgeMetrics::default()),
            RawEdge::Named {
                source,
                destination,
                quantity,
                trip_count,
                metrics,
            } => (source, destination, quantity, trip_count, metrics),
        };
        EdgeRecord {
            source: department_id(&source).to_string(),
            destination: department_id(&destination).to_string(),
            quantity,
            trip_count,
            metrics,
        }
    }
}

impl<'de> Deserialize<'de> for EdgeRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawEdge::deserialize(deserializer).map(EdgeRecord::from)
    }
}

impl EdgeRecord {
    pub fn new(source: &str, destination: &str, quantity: u64, trip_count: u64) -> Self {
        EdgeRecord {
            source: department_id(source).to_string(),
            destination: department_id(destination).to_string(),
            quantity,
            trip_count,
            metrics: EdgeMetrics::default(),
        }
    }

    pub fn with_metrics(mut self, distance: f64, time: f64) -> Self {
        self.metrics = EdgeMetrics {
            distance: Some(distance),
            time: Some(time),
        };
        self
    }

    pub fn is_self_edge(&self) -> bool {
        self.source == self.destination
    }

    pub fn touches_dummy(&self) -> bool {
        is_dummy(&self.source) || is_dummy(&self.destination)
    }
}

/// One render cycle worth of data as delivered by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub facility: BTreeMap<String, FacilityRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub date_boundaries: Vec<String>,
    #[serde(default)]
    pub involved_edges_count: u64,
    #[serde(default)]
    pub self_edges_total_weight: f64,
}

impl Payload {
    /// Largest x and y over every boundary point of every department.
    pub fn extents(&self) -> (f64, f64) {
        let mut max_x = 0.0_f64;
        let mut max_y = 0.0_f64;
        for rec in self.facility.values() {
            for p in &rec.boundaries {
                if p.x > max_x {
                    max_x = p.x;
                }
                if p.y > max_y {
                    max_y = p.y;
                }
            }
        }
        (max_x, max_y)
    }

    pub fn max_quantity(&self) -> u64 {
        self.edges.iter().map(|e| e.quantity).max().unwrap_or(0)
    }

    /// Date part (before the first space) of the start and end bound.
    pub fn date_span(&self) -> Option<(&str, &str)> {
        let start = self.date_boundaries.first()?;
        let end = self.date_boundaries.get(1)?;
        Some((date_part(start), date_part(end)))
    }

    /// Log outline problems. Returns how many departments had any.
    pub fn log_geometry_issues(&self) -> usize {
        let mut bad = 0;
        for (id, rec) in &self.facility {
            let issues = rec.validate();
            if !issues.is_empty() {
                warn!(department = %id, ?issues, "department outline violates geometry invariants");
                bad += 1;
            }
        }
        bad
    }
}

fn date_part(s: &str) -> &str {
    s.split(' ').next().unwrap_or(s)
}

/// Decode a backend response body. A `status` field turns the whole body
/// into an application error regardless of what else it carries.
pub fn parse_payload(text: &str) -> Result<Payload, LoadError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if let Some(status) = value.get("status") {
        let msg = match status {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(LoadError::Server(msg));
    }
    let payload: Payload = serde_json::from_value(value)?;
    debug!(
        departments = payload.facility.len(),
        edges = payload.edges.len(),
        "decoded payload"
    );
    Ok(payload)
}
