//! HTML fragments for the panels around the diagram.

use flowmap_core::filter::{DatePreset, DropdownOption};
use flowmap_core::{LegendEntry, Summary, TableRow};

use crate::svg_escape;

/// `<tr>` rows for the statistics table body, tagged with their edge index
/// so hovering a row can highlight the matching edge.
pub fn table_body(rows: &[TableRow]) -> String {
    let mut s = String::new();
    for r in rows {
        s.push_str(&format!(
            "<tr data-edge=\"{}\"><td style=\"background-color:{}\"></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            r.edge,
            r.color,
            svg_escape(&r.source),
            r.trips,
            r.quantity,
            r.distance_label(),
            r.duration_label(),
            svg_escape(&r.destination)
        ));
    }
    s
}

pub fn legend_items(legend: &[LegendEntry]) -> String {
    legend
        .iter()
        .map(|e| {
            format!(
                "<li style=\"background-color:{}\" title=\"{}\"></li>",
                e.color, e.quantity
            )
        })
        .collect()
}

pub fn department_options(options: &[DropdownOption]) -> String {
    options
        .iter()
        .map(|o| {
            let sel = if o.selected {
                " selected=\"selected\""
            } else {
                ""
            };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                svg_escape(&o.value),
                sel,
                svg_escape(&o.label)
            )
        })
        .collect()
}

pub fn preset_options() -> String {
    let mut s = String::from("<option value=\"\">Presets</option>");
    for p in DatePreset::ALL {
        s.push_str(&format!("<option value=\"{0}\">{0}</option>", p.label()));
    }
    s
}

/// Overlay content when a request fails.
pub fn error_overlay(image: &str, message: &str) -> String {
    format!(
        "<img src=\"{}\"><br>{}",
        svg_escape(image),
        svg_escape(message)
    )
}

/// Class name of each statistics field and the text it shows.
pub fn statistics(summary: &Summary) -> [(&'static str, String); 6] {
    [
        (
            "total_amount_of_transportations",
            summary.total_trips.to_string(),
        ),
        ("total_items_transported", summary.total_items.to_string()),
        ("dummy_count", summary.dummy_count.to_string()),
        ("dep_involved", summary.involved_label.clone()),
        ("date_range", summary.date_range_label.clone()),
        ("omitted_self-edges", summary.self_edge_weight.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmap_core::summary::{legend, summarize, table_rows};
    use flowmap_core::{EdgeRecord, Payload};

    fn payload() -> Payload {
        Payload {
            edges: vec![
                EdgeRecord::new("A", "B", 3, 2).with_metrics(1.5, 90_000.0),
                EdgeRecord::new("B", "<C>", 9, 1),
            ],
            date_boundaries: vec!["2018-01-01 00:00:00".into(), "2018-02-01 00:00:00".into()],
            involved_edges_count: 2,
            self_edges_total_weight: 0.0,
            ..Payload::default()
        }
    }

    #[test]
    fn table_rows_render_in_order() {
        let html = table_body(&table_rows(&payload()));
        let first = html.find("data-edge=\"1\"").unwrap();
        let second = html.find("data-edge=\"0\"").unwrap();
        assert!(first < second);
        assert!(html.contains("<td>&lt;C&gt;</td>"));
        assert!(html.contains("<td>3.00</td><td>2 d 2 h 0 min</td>"));
        assert!(html.contains("<td>0.00</td><td>-</td>"));
    }

    #[test]
    fn legend_has_one_item_per_edge() {
        let html = legend_items(&legend(&payload()));
        assert_eq!(html.matches("<li ").count(), 2);
        assert!(html.find("title=\"3\"").unwrap() < html.find("title=\"9\"").unwrap());
    }

    #[test]
    fn dropdown_marks_selection() {
        let opts = vec![
            DropdownOption {
                value: "ALL".into(),
                label: "All".into(),
                selected: false,
            },
            DropdownOption {
                value: "B".into(),
                label: "B".into(),
                selected: true,
            },
        ];
        assert_eq!(
            department_options(&opts),
            "<option value=\"ALL\">All</option><option value=\"B\" selected=\"selected\">B</option>"
        );
    }

    #[test]
    fn presets_listed_in_order() {
        let html = preset_options();
        assert_eq!(html.matches("<option").count(), 8);
        assert!(html.find("Full range").unwrap() < html.find("Next year").unwrap());
    }

    #[test]
    fn statistics_fields() {
        let s = summarize(&payload(), 14);
        let fields = statistics(&s);
        assert_eq!(fields[0], ("total_amount_of_transportations", "3".to_string()));
        assert_eq!(fields[3].1, "2 from 14");
        assert_eq!(fields[4].1, "2018-01-01 - 2018-02-01");
        assert_eq!(fields[5].1, "0");
        assert_eq!(
            error_overlay("static/res/error.png", "no data"),
            "<img src=\"static/res/error.png\"><br>no data"
        );
    }
}
