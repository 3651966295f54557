use flowmap_core::scene::{DepartmentShape, EdgeShape};
use flowmap_core::{
    CycleOutcome, FilterController, LoadError, Rgb, SceneSink, ViewPhase, ViewerConfig, Viewport,
    apply_response,
};

#[derive(Default)]
struct RecordingSink {
    calls: Vec<String>,
}

impl SceneSink for RecordingSink {
    fn begin(&mut self, viewport: Viewport, view_box: (f64, f64)) {
        self.calls.push(format!(
            "begin {}x{} {:.2} {:.2}",
            viewport.width, viewport.height, view_box.0, view_box.1
        ));
    }

    fn polygon(&mut self, dept: &DepartmentShape) {
        self.calls.push(format!("polygon {}", dept.id));
    }

    fn edge(&mut self, edge: &EdgeShape) {
        self.calls.push(format!(
            "edge {}->{} {} {}",
            edge.source,
            edge.destination,
            edge.stroke,
            edge.offset.pixels()
        ));
    }

    fn marker(&mut self, dept: &DepartmentShape, fill: Rgb) {
        self.calls.push(format!("marker {} {}", dept.id, fill));
    }

    fn label(&mut self, dept: &DepartmentShape) {
        self.calls.push(format!("label {}", dept.id));
    }

    fn end(&mut self) {
        self.calls.push("end".into());
    }
}

const BODY: &str = r#"{
    "facility": {
        "A": {"boundaries": [[0,0],[10,0],[10,10],[0,10]], "points": {"centroid": [5,5]}},
        "B": {"boundaries": [[20,0],[30,0],[30,10],[20,10]], "points": {"centroid": [25,5]}},
        "C": {"boundaries": [[0,20],[10,20],[10,30],[0,30]], "points": {"centroid": [5,25]}}
    },
    "edges": [
        ["A", "B", 10, 2, {"distance": 12, "time": 75}],
        ["B", "A", 40, 5, {}],
        ["A", "C", 20, 1, {"distance": 3.5, "time": 20}],
        ["C", "C", 3, 1, {}],
        ["DUMMY.in", "A", 5, 1, {}]
    ],
    "date_boundaries": ["2018-01-01 00:00:00", "2018-06-30 23:59:59"],
    "involved_edges_count": 3,
    "self_edges_total_weight": 3
}"#;

fn viewport() -> Viewport {
    Viewport {
        width: 900.0,
        height: 600.0,
    }
}

#[test]
fn server_status_draws_nothing() {
    let cfg = ViewerConfig::default();
    let mut controller = FilterController::new(&cfg);
    let req = controller.initial_request();
    let mut sink = RecordingSink::default();
    let outcome = apply_response(
        &mut controller,
        req.generation,
        Ok(r#"{"status": "no data"}"#.to_string()),
        viewport(),
        &cfg,
        &mut sink,
    );
    assert!(matches!(outcome, CycleOutcome::Failed(ref m) if m == "no data"));
    assert!(sink.calls.is_empty());
    assert_eq!(controller.phase(), &ViewPhase::ErrorDisplayed("no data".into()));
}

#[test]
fn transport_failure_is_shown_like_server_error() {
    let cfg = ViewerConfig::default();
    let mut controller = FilterController::new(&cfg);
    let req = controller.initial_request();
    let mut sink = RecordingSink::default();
    let outcome = apply_response(
        &mut controller,
        req.generation,
        Err(LoadError::Transport("HTTP 502".into())),
        viewport(),
        &cfg,
        &mut sink,
    );
    assert!(matches!(outcome, CycleOutcome::Failed(ref m) if m.contains("HTTP 502")));
    assert!(sink.calls.is_empty());
}

#[test]
fn full_cycle_draws_in_paint_order() {
    let cfg = ViewerConfig::default();
    let mut controller = FilterController::new(&cfg);
    let req = controller.initial_request();
    let mut sink = RecordingSink::default();
    let outcome = apply_response(
        &mut controller,
        req.generation,
        Ok(BODY.to_string()),
        viewport(),
        &cfg,
        &mut sink,
    );
    let CycleOutcome::Rendered(cycle) = outcome else {
        panic!("expected a rendered cycle");
    };

    assert_eq!(sink.calls.first().map(|s| s.starts_with("begin 900x600")), Some(true));
    assert_eq!(sink.calls.last().map(String::as_str), Some("end"));
    let kinds: Vec<&str> = sink
        .calls
        .iter()
        .map(|c| c.split(' ').next().unwrap_or(""))
        .collect();
    let first_edge = kinds.iter().position(|k| *k == "edge").unwrap();
    let last_polygon = kinds.iter().rposition(|k| *k == "polygon").unwrap();
    let first_marker = kinds.iter().position(|k| *k == "marker").unwrap();
    assert!(last_polygon < first_edge);
    assert!(first_edge < first_marker);
    // the self-edge and the edge from the unknown DUMMY node are not drawn
    assert_eq!(kinds.iter().filter(|k| **k == "edge").count(), 3);

    assert_eq!(cycle.summary.total_items, 78);
    assert_eq!(cycle.summary.dummy_count, 5);
    assert_eq!(cycle.summary.involved_label, "3 from 14");
    assert_eq!(cycle.summary.date_range_label, "2018-01-01 - 2018-06-30");
    assert_eq!(cycle.rows.len(), 5);
    assert_eq!(cycle.rows[0].quantity, 40);
    assert_eq!(cycle.legend.first().map(|l| l.quantity), Some(3));
    assert_eq!(cycle.departments.len(), 4);
    assert_eq!(controller.phase(), &ViewPhase::Rendered);
    assert!(controller.bounds().is_some());
}

#[test]
fn rendering_twice_is_identical() {
    let cfg = ViewerConfig::default();
    let mut controller = FilterController::new(&cfg);
    let mut runs = Vec::new();
    for _ in 0..2 {
        let req = controller.apply();
        let mut sink = RecordingSink::default();
        let outcome = apply_response(
            &mut controller,
            req.generation,
            Ok(BODY.to_string()),
            viewport(),
            &cfg,
            &mut sink,
        );
        assert!(matches!(outcome, CycleOutcome::Rendered(_)));
        runs.push(sink.calls);
    }
    assert_eq!(runs[0].len(), runs[1].len());
    assert_eq!(runs[0], runs[1]);
}

#[test]
fn late_response_does_not_replace_newer_one() {
    let cfg = ViewerConfig::default();
    let mut controller = FilterController::new(&cfg);
    let old = controller.initial_request();
    let new = controller.select_department("A");

    let mut sink = RecordingSink::default();
    let fresh = apply_response(
        &mut controller,
        new.generation,
        Ok(BODY.to_string()),
        viewport(),
        &cfg,
        &mut sink,
    );
    assert!(matches!(fresh, CycleOutcome::Rendered(_)));
    let drawn = sink.calls.len();

    let late = apply_response(
        &mut controller,
        old.generation,
        Ok(r#"{"status": "too late"}"#.to_string()),
        viewport(),
        &cfg,
        &mut sink,
    );
    assert!(matches!(late, CycleOutcome::Stale));
    assert_eq!(sink.calls.len(), drawn);
    assert_eq!(controller.phase(), &ViewPhase::Rendered);
}

#[test]
fn hover_round_trip_after_render() {
    let cfg = ViewerConfig::default();
    let mut controller = FilterController::new(&cfg);
    let req = controller.initial_request();
    let mut sink = RecordingSink::default();
    let CycleOutcome::Rendered(mut cycle) = apply_response(
        &mut controller,
        req.generation,
        Ok(BODY.to_string()),
        viewport(),
        &cfg,
        &mut sink,
    ) else {
        panic!("expected a rendered cycle");
    };
    let original = cycle.scene.edges[1].stroke;
    let lit = cycle.scene.highlight(1);
    assert_eq!(lit.len(), 3);
    let back = cycle.scene.restore(1);
    let stroke = back.iter().find(|c| c.attribute == "stroke").unwrap();
    assert_eq!(stroke.value, original.to_string());
}
