//! Batch-level summary over a set of assessments.

use crate::assessment::RiskAssessment;
use crate::classifier::RiskLevel;
use crate::scorer::FactorKind;
use crate::types::UserKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRiskSummary {
    pub user_key: UserKey,
    pub transaction_count: usize,
    pub total_score: f64,
}

/// Aggregate view of one scored batch, suitable for export alongside the
/// per-transaction assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total_transactions: usize,
    /// Assessments at HIGH or above.
    pub high_risk: usize,
    pub critical_risk: usize,
    pub mean_score: f64,
    /// How often each factor kind triggered across the batch.
    pub factor_counts: BTreeMap<FactorKind, usize>,
    /// Users ranked by summed composite score, highest first.
    pub top_users: Vec<UserRiskSummary>,
    pub geographic_mismatches: usize,
    pub velocity_violations: usize,
}

const TOP_USERS: usize = 10;

impl BatchReport {
    pub fn from_assessments(assessments: &[RiskAssessment]) -> Self {
        let total = assessments.len();
        let mut factor_counts: BTreeMap<FactorKind, usize> = BTreeMap::new();
        let mut per_user: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
        let mut high_risk = 0;
        let mut critical_risk = 0;
        let mut geographic_mismatches = 0;
        let mut velocity_violations = 0;
        let mut score_sum = 0.0;

        for assessment in assessments {
            score_sum += assessment.composite_score;
            if assessment.risk_level >= RiskLevel::High {
                high_risk += 1;
            }
            if assessment.risk_level == RiskLevel::Critical {
                critical_risk += 1;
            }
            for factor in &assessment.factors {
                *factor_counts.entry(factor.kind).or_default() += 1;
            }
            if assessment
                .factors
                .iter()
                .any(|f| f.kind == FactorKind::GeographicMismatch)
            {
                geographic_mismatches += 1;
            }
            if assessment
                .factors
                .iter()
                .any(|f| f.kind == FactorKind::HighVelocity)
            {
                velocity_violations += 1;
            }
            if let Some(user) = assessment.user_key.as_deref() {
                let entry = per_user.entry(user).or_default();
                entry.0 += 1;
                entry.1 += assessment.composite_score;
            }
        }

        let mut top_users: Vec<UserRiskSummary> = per_user
            .into_iter()
            .map(|(user_key, (transaction_count, total_score))| UserRiskSummary {
                user_key: user_key.to_string(),
                transaction_count,
                total_score,
            })
            .collect();
        // Highest total first; key order breaks ties so output is stable.
        top_users.sort_by(|a, b| {
            b.total_score
                .total_cmp(&a.total_score)
                .then_with(|| a.user_key.cmp(&b.user_key))
        });
        top_users.truncate(TOP_USERS);

        Self {
            total_transactions: total,
            high_risk,
            critical_risk,
            mean_score: if total == 0 { 0.0 } else { score_sum / total as f64 },
            factor_counts,
            top_users,
            geographic_mismatches,
            velocity_violations,
        }
    }
}
