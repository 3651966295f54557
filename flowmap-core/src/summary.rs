use std::cmp::Ordering;

use serde::Serialize;

use crate::color::{Rgb, volume_color};
use crate::model::{EdgeRecord, Payload};

/// Shown wherever a duration cannot be computed.
pub const UNKNOWN_PLACEHOLDER: &str = "-";

const SECS_PER_MIN: u64 = 60;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_DAY: u64 = 86_400;

/// Cross-cutting numbers for the statistics panel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total_trips: u64,
    pub total_items: u64,
    pub dummy_count: u64,
    pub involved_count: u64,
    pub involved_label: String,
    pub date_range_label: String,
    pub self_edge_weight: f64,
}

/// Single pass over the edges. The involved count and the self-edge weight
/// are computed by the server and only passed through.
pub fn summarize(payload: &Payload, department_total: u32) -> Summary {
    let mut total_trips = 0;
    let mut total_items = 0;
    let mut dummy_count = 0;
    for e in &payload.edges {
        total_items += e.quantity;
        total_trips += e.trip_count;
        if e.touches_dummy() {
            dummy_count += e.quantity;
        }
    }
    let date_range_label = payload
        .date_span()
        .map(|(a, b)| format!("{a} - {b}"))
        .unwrap_or_default();
    Summary {
        total_trips,
        total_items,
        dummy_count,
        involved_count: payload.involved_edges_count,
        involved_label: format!("{} from {}", payload.involved_edges_count, department_total),
        date_range_label,
        self_edge_weight: payload.self_edges_total_weight,
    }
}

/// `"D d H h M min"` from one day on, `"H h M min"` below that.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return UNKNOWN_PLACEHOLDER.to_string();
    }
    let total = seconds.floor() as u64;
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MIN;
    if days > 0 {
        format!("{days} d {hours} h {minutes} min")
    } else {
        format!("{hours} h {minutes} min")
    }
}

/// `"M min S sec"` for a single trip, minutes within the hour.
pub fn format_trip_time(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => {
            let total = s.floor() as u64;
            format!(
                "{} min {} sec",
                (total % SECS_PER_HOUR) / SECS_PER_MIN,
                total % SECS_PER_MIN
            )
        }
        _ => UNKNOWN_PLACEHOLDER.to_string(),
    }
}

/// One line of the statistics table, tied back to its edge by index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    pub edge: usize,
    pub color: Rgb,
    pub source: String,
    pub trips: u64,
    pub quantity: u64,
    pub total_distance: f64,
    pub total_seconds: Option<f64>,
    pub destination: String,
}

impl TableRow {
    pub fn distance_label(&self) -> String {
        format!("{:.2}", self.total_distance)
    }

    pub fn duration_label(&self) -> String {
        match self.total_seconds {
            Some(s) => format_duration(s),
            None => UNKNOWN_PLACEHOLDER.to_string(),
        }
    }
}

fn table_row(edge: usize, e: &EdgeRecord, max_quantity: u64) -> TableRow {
    TableRow {
        edge,
        color: volume_color(e.quantity, max_quantity),
        source: e.source.clone(),
        trips: e.trip_count,
        quantity: e.quantity,
        total_distance: e.metrics.distance_or_zero() * e.trip_count as f64,
        total_seconds: e.metrics.known_time().map(|t| t * e.trip_count as f64),
        destination: e.destination.clone(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableColumn {
    Source,
    Trips,
    Quantity,
    Distance,
    Duration,
    Destination,
}

impl TableColumn {
    /// Header cell position; column 0 is the color swatch and never sorts.
    pub fn from_index(i: usize) -> Option<TableColumn> {
        match i {
            1 => Some(TableColumn::Source),
            2 => Some(TableColumn::Trips),
            3 => Some(TableColumn::Quantity),
            4 => Some(TableColumn::Distance),
            5 => Some(TableColumn::Duration),
            6 => Some(TableColumn::Destination),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableSort {
    pub column: TableColumn,
    pub descending: bool,
}

impl Default for TableSort {
    fn default() -> Self {
        TableSort {
            column: TableColumn::Quantity,
            descending: true,
        }
    }
}

impl TableSort {
    /// Header click: same column flips direction, a new column starts
    /// descending.
    pub fn toggled(self, column: TableColumn) -> TableSort {
        if self.column == column {
            TableSort {
                column,
                descending: !self.descending,
            }
        } else {
            TableSort {
                column,
                descending: true,
            }
        }
    }

    /// Unknown durations go last in either direction.
    fn compare(&self, a: &TableRow, b: &TableRow) -> Ordering {
        if self.column == TableColumn::Duration {
            match (a.total_seconds, b.total_seconds) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Greater,
                (Some(_), None) => return Ordering::Less,
                (Some(_), Some(_)) => {}
            }
        }
        let ord = match self.column {
            TableColumn::Source => a.source.cmp(&b.source),
            TableColumn::Trips => a.trips.cmp(&b.trips),
            TableColumn::Quantity => a.quantity.cmp(&b.quantity),
            TableColumn::Distance => a.total_distance.total_cmp(&b.total_distance),
            TableColumn::Duration => a
                .total_seconds
                .unwrap_or_default()
                .total_cmp(&b.total_seconds.unwrap_or_default()),
            TableColumn::Destination => a.destination.cmp(&b.destination),
        };
        if self.descending { ord.reverse() } else { ord }
    }
}

/// Stable sort, so ties keep payload order.
pub fn sort_rows(rows: &mut [TableRow], sort: TableSort) {
    rows.sort_by(|a, b| sort.compare(a, b));
}

/// Table rows in the default order (quantity, descending).
pub fn table_rows(payload: &Payload) -> Vec<TableRow> {
    let max_q = payload.max_quantity();
    let mut rows: Vec<TableRow> = payload
        .edges
        .iter()
        .enumerate()
        .map(|(i, e)| table_row(i, e, max_q))
        .collect();
    sort_rows(&mut rows, TableSort::default());
    rows
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LegendEntry {
    pub quantity: u64,
    pub color: Rgb,
}

/// One swatch per edge, ascending by volume.
pub fn legend(payload: &Payload) -> Vec<LegendEntry> {
    let mut quantities: Vec<u64> = payload.edges.iter().map(|e| e.quantity).collect();
    quantities.sort_unstable();
    let max_q = quantities.last().copied().unwrap_or(0);
    quantities
        .into_iter()
        .map(|q| LegendEntry {
            quantity: q,
            color: volume_color(q, max_q),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn payload(edges: Vec<EdgeRecord>) -> Payload {
        Payload {
            edges,
            date_boundaries: vec!["2018-03-01 00:00:00".into(), "2018-04-01 12:00:00".into()],
            involved_edges_count: 9,
            self_edges_total_weight: 41.0,
            ..Payload::default()
        }
    }

    #[test]
    fn dummy_flow_is_counted_separately() {
        let p = payload(vec![
            EdgeRecord::new("DUMMY1", "A", 5, 2),
            EdgeRecord::new("A", "B", 10, 3),
        ]);
        let s = summarize(&p, 14);
        assert_eq!(s.dummy_count, 5);
        assert_eq!(s.total_items, 15);
        assert_eq!(s.total_trips, 5);
        assert_eq!(s.involved_count, 9);
        assert_eq!(s.involved_label, "9 from 14");
        assert_eq!(s.date_range_label, "2018-03-01 - 2018-04-01");
        assert_eq!(s.self_edge_weight, 41.0);
    }

    #[test]
    fn dummy_on_destination_side_counts_too() {
        let p = payload(vec![EdgeRecord::new("A", "DUMMY_OUT", 8, 1)]);
        assert_eq!(summarize(&p, 20).dummy_count, 8);
        assert_eq!(summarize(&p, 20).involved_label, "9 from 20");
    }

    #[rstest]
    #[case(90_000.0, "1 d 1 h 0 min")]
    #[case(3_000.0, "0 h 50 min")]
    #[case(0.0, "0 h 0 min")]
    #[case(86_399.0, "23 h 59 min")]
    #[case(40.0 * 86_400.0 + 61.0, "40 d 0 h 1 min")]
    fn durations(#[case] secs: f64, #[case] expected: &str) {
        assert_eq!(format_duration(secs), expected);
    }

    #[test]
    fn trip_time_is_minutes_and_seconds() {
        assert_eq!(format_trip_time(Some(125.0)), "2 min 5 sec");
        assert_eq!(format_trip_time(None), "-");
    }

    #[test]
    fn rows_default_to_quantity_descending() {
        let p = payload(vec![
            EdgeRecord::new("A", "B", 3, 1).with_metrics(12.5, 30.0),
            EdgeRecord::new("B", "C", 30, 4),
            EdgeRecord::new("C", "A", 10, 2).with_metrics(4.0, 1_800.0),
        ]);
        let rows = table_rows(&p);
        let order: Vec<usize> = rows.iter().map(|r| r.edge).collect();
        assert_eq!(order, vec![1, 2, 0]);

        let missing = &rows[0];
        assert_eq!(missing.distance_label(), "0.00");
        assert_eq!(missing.duration_label(), "-");

        let known = &rows[1];
        assert_eq!(known.distance_label(), "8.00");
        assert_eq!(known.duration_label(), "1 h 0 min");
        assert_eq!(known.color, volume_color(10, 30));
    }

    #[test]
    fn header_clicks_toggle_direction() {
        let p = payload(vec![
            EdgeRecord::new("B", "X", 1, 1),
            EdgeRecord::new("A", "X", 2, 1),
        ]);
        let mut rows = table_rows(&p);
        let sort = TableSort::default().toggled(TableColumn::Source);
        assert!(sort.descending);
        let sort = sort.toggled(TableColumn::Source);
        assert!(!sort.descending);
        sort_rows(&mut rows, sort);
        assert_eq!(rows[0].source, "A");
        assert_eq!(TableColumn::from_index(0), None);
    }

    #[rstest]
    #[case(false, vec![0, 2, 1])]
    #[case(true, vec![2, 0, 1])]
    fn unknown_durations_sort_last(#[case] descending: bool, #[case] expected: Vec<usize>) {
        let p = payload(vec![
            EdgeRecord::new("A", "B", 1, 1).with_metrics(1.0, 60.0),
            EdgeRecord::new("B", "C", 2, 1),
            EdgeRecord::new("C", "A", 3, 1).with_metrics(1.0, 600.0),
        ]);
        let mut rows = table_rows(&p);
        sort_rows(
            &mut rows,
            TableSort {
                column: TableColumn::Duration,
                descending,
            },
        );
        let order: Vec<usize> = rows.iter().map(|r| r.edge).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn legend_is_ascending() {
        let p = payload(vec![
            EdgeRecord::new("A", "B", 40, 1),
            EdgeRecord::new("B", "C", 2, 1),
            EdgeRecord::new("C", "D", 17, 1),
        ]);
        let l = legend(&p);
        let qs: Vec<u64> = l.iter().map(|e| e.quantity).collect();
        assert_eq!(qs, vec![2, 17, 40]);
        assert_eq!(l[2].color, volume_color(40, 40));
    }
}
