//! Error taxonomy for the scoring engine.
//!
//! RULE: data-quality problems (missing field, malformed IP, empty anomaly
//! column) are NOT errors. They degrade the affected field to unknown and
//! the factors that depend on it do not trigger. Only configuration errors
//! and usage errors surface here.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Out-of-order observation for user '{user_key}': {next} arrived after {prev}")]
    OutOfOrderObservation {
        user_key: String,
        prev: DateTime<Utc>,
        next: DateTime<Utc>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
