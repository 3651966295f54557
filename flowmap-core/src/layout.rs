use crate::model::EdgeRecord;

/// Pixel shift applied to both endpoints of an edge so that directed lines
/// sharing a corridor do not sit exactly on top of each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeOffset {
    /// A reverse edge exists; nudge this one aside.
    Reverse,
    /// The destination never ships anything onward.
    Terminal,
    None,
}

impl EdgeOffset {
    pub fn pixels(self) -> f64 {
        match self {
            EdgeOffset::Reverse => 1.0,
            EdgeOffset::Terminal => -2.0,
            EdgeOffset::None => 0.0,
        }
    }
}

/// Offset for the edge at `idx`. The reverse-edge check takes precedence
/// over the terminal check.
pub fn resolve_offset(edges: &[EdgeRecord], idx: usize) -> EdgeOffset {
    let e = &edges[idx];
    let has_reverse = edges
        .iter()
        .enumerate()
        .any(|(j, o)| j != idx && o.source == e.destination && o.destination == e.source);
    if has_reverse {
        return EdgeOffset::Reverse;
    }
    if !edges.iter().any(|o| o.source == e.destination) {
        return EdgeOffset::Terminal;
    }
    EdgeOffset::None
}

/// Offsets for the whole edge set, index-aligned with `edges`.
///
/// All-pairs scan, O(E^2). Fine for a few hundred edges.
pub fn resolve_offsets(edges: &[EdgeRecord]) -> Vec<EdgeOffset> {
    (0..edges.len()).map(|i| resolve_offset(edges, i)).collect()
}
