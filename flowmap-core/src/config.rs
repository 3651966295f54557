use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Share of the viewport the facility drawing may fill along each axis.
pub const FILL_FACTOR: f64 = 0.945;
/// Total number of departments the "involved" statistic is reported against.
pub const DEFAULT_DEPARTMENT_TOTAL: u32 = 14;
pub const DEFAULT_ERROR_IMAGE: &str = "static/res/error.png";
pub const IDLE_INFO_TEXT: &str = "no additional info to display";

/// Runtime settings for both the browser viewer and the snapshot tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Prefix prepended to the backend endpoints (the Flask script root).
    pub script_root: String,
    pub department_total: u32,
    pub fill_factor: f64,
    pub error_image: String,
    pub idle_info_text: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            script_root: String::new(),
            department_total: DEFAULT_DEPARTMENT_TOTAL,
            fill_factor: FILL_FACTOR,
            error_image: DEFAULT_ERROR_IMAGE.to_string(),
            idle_info_text: IDLE_INFO_TEXT.to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: ViewerConfig = serde_json::from_str(text)?;
        cfg.validated()
    }

    pub fn validated(self) -> Result<Self, ConfigError> {
        if !(self.fill_factor > 0.5 && self.fill_factor <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "fill_factor",
                expected: "in (0.5, 1]",
                value: self.fill_factor,
            });
        }
        Ok(self)
    }

    /// Fraction of each viewport axis left empty on either side.
    pub fn margin_fraction(&self) -> f64 {
        1.0 - self.fill_factor
    }

    pub fn endpoint(&self, path: &str) -> String {
        let root = self.script_root.trim_end_matches('/');
        format!("{}/{}", root, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ViewerConfig::from_json(r#"{"department_total": 20}"#).unwrap();
        assert_eq!(cfg.department_total, 20);
        assert_eq!(cfg.fill_factor, FILL_FACTOR);
        assert_eq!(cfg.idle_info_text, IDLE_INFO_TEXT);
    }

    #[test]
    fn rejects_silly_fill_factor() {
        assert!(matches!(
            ViewerConfig::from_json(r#"{"fill_factor": 1.5}"#),
            Err(ConfigError::OutOfRange { field: "fill_factor", .. })
        ));
    }

    #[test]
    fn endpoint_joins_root() {
        let mut cfg = ViewerConfig::default();
        assert_eq!(cfg.endpoint("get_data"), "/get_data");
        cfg.script_root = "https://host/app/".into();
        assert_eq!(cfg.endpoint("/get_data"), "https://host/app/get_data");
    }
}
