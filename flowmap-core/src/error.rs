use thiserror::Error;

/// Why a render cycle could not produce a payload.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The backend answered with a `status` field.
    #[error("{0}")]
    Server(String),
    #[error("could not decode payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid viewer config: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}
