//! Filter state and the request/response state machine around it.
//!
//! Every user action that changes the filter issues a new request tagged
//! with a generation number. Only the response carrying the latest
//! generation is allowed to replace the diagram; anything older is dropped.

use chrono::{Months, NaiveDate};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::error::LoadError;
use crate::model::Payload;

/// Dropdown value standing for "no department filter".
pub const ALL_DEPARTMENTS: &str = "ALL";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Parse the date part of a backend timestamp (`"2018-03-01 00:00:00"`).
pub fn parse_boundary(s: &str) -> Option<NaiveDate> {
    let day = s.split(' ').next().unwrap_or(s);
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatePreset {
    FullRange,
    PreviousYear,
    PreviousThreeMonths,
    PreviousMonth,
    NextMonth,
    NextThreeMonths,
    NextYear,
}

impl DatePreset {
    pub const ALL: [DatePreset; 7] = [
        DatePreset::FullRange,
        DatePreset::PreviousYear,
        DatePreset::PreviousThreeMonths,
        DatePreset::PreviousMonth,
        DatePreset::NextMonth,
        DatePreset::NextThreeMonths,
        DatePreset::NextYear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DatePreset::FullRange => "Full range",
            DatePreset::PreviousYear => "Previous year",
            DatePreset::PreviousThreeMonths => "Previous 3 months",
            DatePreset::PreviousMonth => "Previous month",
            DatePreset::NextMonth => "Next month",
            DatePreset::NextThreeMonths => "Next 3 months",
            DatePreset::NextYear => "Next year",
        }
    }

    pub fn from_label(label: &str) -> Option<DatePreset> {
        DatePreset::ALL.into_iter().find(|p| p.label() == label)
    }

    /// Range for this preset. Month arithmetic clamps to the end of shorter
    /// months. `Full range` needs the absolute bounds of the data.
    pub fn range(
        self,
        today: NaiveDate,
        bounds: Option<(NaiveDate, NaiveDate)>,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let back = |m: u32| today.checked_sub_months(Months::new(m)).map(|d| (d, today));
        let ahead = |m: u32| today.checked_add_months(Months::new(m)).map(|d| (today, d));
        match self {
            DatePreset::FullRange => bounds,
            DatePreset::PreviousYear => back(12),
            DatePreset::PreviousThreeMonths => back(3),
            DatePreset::PreviousMonth => back(1),
            DatePreset::NextMonth => ahead(1),
            DatePreset::NextThreeMonths => ahead(3),
            DatePreset::NextYear => ahead(12),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// `None` means all departments.
    pub department: Option<String>,
    /// Sorting key forwarded as `main_item`.
    pub grouping_key: String,
}

impl FilterState {
    pub fn department_value(&self) -> &str {
        self.department.as_deref().unwrap_or("")
    }

    pub fn query_string(&self) -> String {
        let date = |d: Option<NaiveDate>| {
            d.map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default()
        };
        format!(
            "start={}&end={}&main_item={}&department={}",
            encode_component(&date(self.start)),
            encode_component(&date(self.end)),
            encode_component(&self.grouping_key),
            encode_component(self.department_value()),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    Loading,
    Rendered,
    ErrorDisplayed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub url: String,
}

#[derive(Debug)]
pub enum Resolution {
    /// An older request finished after a newer one was issued.
    Stale,
    Render(Payload),
    ShowError(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug)]
pub struct FilterController {
    state: FilterState,
    bounds: Option<(NaiveDate, NaiveDate)>,
    phase: ViewPhase,
    generation: u64,
    /// Generation of the unfiltered load; only it may fix `bounds`.
    initial_generation: Option<u64>,
    data_url: String,
    filtered_url: String,
}

impl FilterController {
    pub fn new(config: &ViewerConfig) -> Self {
        FilterController {
            state: FilterState::default(),
            bounds: None,
            phase: ViewPhase::Idle,
            generation: 0,
            initial_generation: None,
            data_url: config.endpoint("get_data"),
            filtered_url: config.endpoint("get_data_filtered"),
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn phase(&self) -> &ViewPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == ViewPhase::Loading
    }

    /// Absolute date range of the data set, known after the first load.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.bounds
    }

    fn issue(&mut self, url: String) -> FetchRequest {
        self.generation += 1;
        self.phase = ViewPhase::Loading;
        debug!(generation = self.generation, %url, "issuing request");
        FetchRequest {
            generation: self.generation,
            url,
        }
    }

    fn filtered(&mut self) -> FetchRequest {
        let url = format!("{}?{}", self.filtered_url, self.state.query_string());
        self.issue(url)
    }

    /// Unfiltered load on start-up.
    pub fn initial_request(&mut self) -> FetchRequest {
        let url = self.data_url.clone();
        let req = self.issue(url);
        self.initial_generation = Some(req.generation);
        req
    }

    /// New date range, clamped into the data bounds once those are known.
    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) -> FetchRequest {
        let (mut start, mut end) = if start <= end {
            (start, end)
        } else {
            (end, start)
        };
        if let Some((lo, hi)) = self.bounds {
            start = start.clamp(lo, hi);
            end = end.clamp(lo, hi);
        }
        self.state.start = Some(start);
        self.state.end = Some(end);
        self.filtered()
    }

    pub fn apply_preset(&mut self, preset: DatePreset, today: NaiveDate) -> Option<FetchRequest> {
        let (start, end) = preset.range(today, self.bounds)?;
        Some(self.set_date_range(start, end))
    }

    /// Dropdown change. `"ALL"` clears the department filter.
    pub fn select_department(&mut self, value: &str) -> FetchRequest {
        self.state.department = match value {
            ALL_DEPARTMENTS | "" => None,
            other => Some(other.to_string()),
        };
        self.filtered()
    }

    /// Takes effect with the next request.
    pub fn set_grouping_key(&mut self, key: &str) {
        self.state.grouping_key = key.to_string();
    }

    pub fn apply(&mut self) -> FetchRequest {
        self.filtered()
    }

    /// Settle a finished request. A successful unfiltered load also fixes the
    /// absolute date bounds and seeds the filter dates from them. Filtered
    /// responses carry a narrower window and never touch the bounds.
    pub fn resolve(&mut self, generation: u64, result: Result<Payload, LoadError>) -> Resolution {
        if generation != self.generation {
            info!(
                generation,
                latest = self.generation,
                "dropping stale response"
            );
            return Resolution::Stale;
        }
        match result {
            Ok(payload) => {
                if self.bounds.is_none() && self.initial_generation == Some(generation) {
                    self.bounds = payload
                        .date_span()
                        .and_then(|(a, b)| Some((parse_boundary(a)?, parse_boundary(b)?)));
                    if let Some((lo, hi)) = self.bounds {
                        self.state.start.get_or_insert(lo);
                        self.state.end.get_or_insert(hi);
                    }
                }
                self.phase = ViewPhase::Rendered;
                Resolution::Render(payload)
            }
            Err(err) => {
                let message = err.to_string();
                match &err {
                    LoadError::Server(_) => warn!(%message, "server reported an error"),
                    _ => warn!(error = %err, "request failed"),
                }
                self.phase = ViewPhase::ErrorDisplayed(message.clone());
                Resolution::ShowError(message)
            }
        }
    }

    /// `ALL` followed by every department of the payload, with the current
    /// selection kept.
    pub fn department_options(&self, payload: &Payload) -> Vec<DropdownOption> {
        let current = self.state.department.as_deref();
        let mut out = vec![DropdownOption {
            value: ALL_DEPARTMENTS.to_string(),
            label: "All".to_string(),
            selected: current.is_none(),
        }];
        out.extend(payload.facility.keys().map(|k| DropdownOption {
            value: k.clone(),
            label: k.clone(),
            selected: current == Some(k.as_str()),
        }));
        out
    }
}
