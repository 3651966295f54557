use tracing::info;

use crate::config::ViewerConfig;
use crate::error::LoadError;
use crate::filter::{DropdownOption, FilterController, Resolution};
use crate::model::{Payload, parse_payload};
use crate::projector::Viewport;
use crate::scene::{Scene, SceneSink, build_scene};
use crate::summary::{LegendEntry, Summary, TableRow, legend, summarize, table_rows};

/// Everything one successful response turns into.
#[derive(Clone, Debug)]
pub struct RenderCycle {
    pub scene: Scene,
    pub summary: Summary,
    pub rows: Vec<TableRow>,
    pub legend: Vec<LegendEntry>,
    pub departments: Vec<DropdownOption>,
}

impl RenderCycle {
    pub fn build(
        payload: &Payload,
        controller: &FilterController,
        viewport: Viewport,
        config: &ViewerConfig,
    ) -> Self {
        let scene = build_scene(payload, viewport, config);
        let summary = summarize(payload, config.department_total);
        info!(
            edges = payload.edges.len(),
            drawn = scene.edges.len(),
            items = summary.total_items,
            trips = summary.total_trips,
            "render cycle ready"
        );
        RenderCycle {
            scene,
            summary,
            rows: table_rows(payload),
            legend: legend(payload),
            departments: controller.department_options(payload),
        }
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Stale,
    Rendered(Box<RenderCycle>),
    Failed(String),
}

/// Decode a response body, settle it against the controller and, if it is
/// the latest successful one, draw it into `sink`.
pub fn apply_response<S: SceneSink>(
    controller: &mut FilterController,
    generation: u64,
    body: Result<String, LoadError>,
    viewport: Viewport,
    config: &ViewerConfig,
    sink: &mut S,
) -> CycleOutcome {
    let decoded = body.and_then(|text| parse_payload(&text));
    match controller.resolve(generation, decoded) {
        Resolution::Stale => CycleOutcome::Stale,
        Resolution::ShowError(message) => CycleOutcome::Failed(message),
        Resolution::Render(payload) => {
            let cycle = RenderCycle::build(&payload, controller, viewport, config);
            cycle.scene.draw(sink);
            CycleOutcome::Rendered(Box::new(cycle))
        }
    }
}
