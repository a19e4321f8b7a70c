//! Error types shared by the fusion, tracking and alerting stages.

use thiserror::Error;

/// Reasons a caller-supplied input is rejected.
///
/// These are never corrected silently: a confidence of `1.02` is an error, not a `1.0`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("expected {expected} source weights, got {got}")]
    WeightCountMismatch { expected: usize, got: usize },

    #[error("expected {expected} solo penalties, got {got}")]
    PenaltyCountMismatch { expected: usize, got: usize },

    #[error("weight for source {source_id} must be finite and positive, got {weight}")]
    InvalidWeight { source_id: usize, weight: f32 },

    #[error("confidence {confidence} from source {source_id} is outside [0, 1]")]
    ConfidenceOutOfRange { source_id: usize, confidence: f32 },

    #[error("detection tagged with source {found} was placed in the set for source {expected}")]
    SourceMismatch { expected: usize, found: usize },

    #[error("malformed box [{x}, {y}, {width}, {height}]: {reason}")]
    MalformedBox {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        reason: &'static str,
    },

    #[error("timestamp must be finite, got {0}")]
    InvalidTimestamp(f64),

    #[error("anomaly score {0} is outside [0, 1]")]
    AnomalyScoreOutOfRange(f32),
}

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, FusionError>;

/// Shorthand for range checks on configuration values.
pub(crate) fn check_unit_interval(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FusionError::InvalidConfig(format!(
            "{name} must lie in [0, 1], got {value}"
        )))
    }
}
