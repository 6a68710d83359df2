//! The per-transaction output record.

use crate::classifier::RiskLevel;
use crate::geo::GeoFacts;
use crate::scorer::RiskFactor;
use crate::types::{TransactionId, UserKey};
use crate::velocity::VelocitySnapshot;
use serde::{Deserialize, Serialize};

/// One fraud risk assessment, created once per input transaction and never
/// mutated afterwards. Serializable as-is for downstream CSV/JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub transaction_id: TransactionId,
    pub user_key: Option<UserKey>,
    /// Capped sum of all triggered factor weights. Non-negative.
    pub composite_score: f64,
    pub risk_level: RiskLevel,
    /// Insertion order is evaluation order — explanations reproduce exactly.
    pub factors: Vec<RiskFactor>,
    pub geo: GeoFacts,
    pub velocity: VelocitySnapshot,
}
