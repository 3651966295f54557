//! Layout, color and aggregation logic behind the facility transport map.
//!
//! Nothing in here touches the DOM; the browser viewer and the snapshot
//! tool both drive a [`Scene`] through a [`SceneSink`].

pub mod color;
pub mod config;
pub mod cycle;
pub mod error;
pub mod filter;
pub mod layout;
pub mod model;
pub mod projector;
pub mod scene;
pub mod summary;
pub mod zoom;

pub use color::{Hsl, Rgb, color_for, volume_color};
pub use config::ViewerConfig;
pub use cycle::{CycleOutcome, RenderCycle, apply_response};
pub use error::{ConfigError, LoadError};
pub use filter::{DatePreset, FetchRequest, FilterController, FilterState, Resolution, ViewPhase};
pub use layout::{EdgeOffset, resolve_offset, resolve_offsets};
pub use model::{EdgeMetrics, EdgeRecord, FacilityRecord, Payload, Point, parse_payload};
pub use projector::{CoordinateProjector, LinearScale, Viewport};
pub use scene::{DepartmentShape, EdgeShape, Scene, SceneSink, StyleChange, build_scene};
pub use summary::{
    LegendEntry, Summary, TableColumn, TableRow, TableSort, format_duration, summarize,
};
pub use zoom::{ZoomState, ZoomTransform, ZoomTransition};
