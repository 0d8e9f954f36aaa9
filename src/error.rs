//! Configuration errors
//!
//! Every rule `RunConfig::validate` enforces has its own variant. These are
//! only ever produced at startup; nothing in the per-frame path returns them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value:.4})")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} minimum {min:.2} exceeds maximum {max:.2}")]
    InvertedBounds {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    OutOfRange {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },

    #[error("at least one segment template must be configured")]
    NoSegmentTemplates,

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("segment `{segment}` references unknown content `{id}`")]
    UnknownContent { segment: String, id: String },

    #[error("segment `{segment}` has a pickup row with amount {amount} (must be at least 1)")]
    InvalidAmount { segment: String, amount: u32 },

    #[error("{field} curve keys must be sorted by t")]
    UnsortedCurve { field: &'static str },

    #[error("failed to parse run config: {0}")]
    Parse(#[from] serde_json::Error),
}
