//! payrisk-core — batch fraud risk scoring for payment transactions.
//!
//! The pipeline: raw record → field extraction → IP geolocation →
//! per-user velocity tracking → batch-wide anomaly detection → composite
//! risk scoring → risk-level classification. One `RiskAssessment` per
//! input record, deterministic given identical input and configuration.

pub mod anomaly;
pub mod assessment;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod geo;
pub mod report;
pub mod scorer;
pub mod transaction;
pub mod types;
pub mod velocity;
