//! Mapping from composite score to a discrete risk level.

use crate::config::RiskBoundaries;
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Pure score → level mapping over validated, strictly ascending lower
/// bounds. LOW is [0, medium), MEDIUM [medium, high), HIGH [high,
/// critical), CRITICAL [critical, ∞) — together they partition [0, cap]
/// with no gaps and no overlaps.
#[derive(Debug, Clone, Copy)]
pub struct RiskClassifier {
    medium: f64,
    high: f64,
    critical: f64,
}

impl RiskClassifier {
    /// Fails on non-ascending boundaries. Construction happens at startup,
    /// before any transaction is processed.
    pub fn new(boundaries: &RiskBoundaries) -> EngineResult<Self> {
        if !(boundaries.medium > 0.0
            && boundaries.high > boundaries.medium
            && boundaries.critical > boundaries.high)
        {
            return Err(EngineError::Config {
                reason: format!(
                    "risk boundaries must be strictly ascending and positive, \
                     got medium={} high={} critical={}",
                    boundaries.medium, boundaries.high, boundaries.critical
                ),
            });
        }
        Ok(Self {
            medium: boundaries.medium,
            high: boundaries.high,
            critical: boundaries.critical,
        })
    }

    pub fn classify(&self, score: f64) -> RiskLevel {
        if score < self.medium {
            RiskLevel::Low
        } else if score < self.high {
            RiskLevel::Medium
        } else if score < self.critical {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}
