//! Composite risk scoring.
//!
//! `RiskScorer::score` is a deterministic, pure function of its inputs:
//! the transaction, the resolved geo facts, the velocity snapshot, and the
//! batch-wide anomaly score. Factors are evaluated in a fixed order and the
//! factors list preserves that order, so explanations are reproducible.
//!
//! Unknown never triggers: a factor whose precondition data is unknown
//! simply does not fire. Unknown is never treated as a mismatch or a match.

use crate::config::EngineConfig;
use crate::geo::GeoFacts;
use crate::transaction::Transaction;
use crate::velocity::VelocitySnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactorKind {
    GeographicMismatch,
    HighVelocity,
    CriticalVelocity,
    SuspiciousAmount,
    RapidSuccession,
    StatisticalOutlier,
    ProxyOrDatacenter,
}

/// One triggered risk signal: its kind, the points it contributed, and a
/// human-readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind: FactorKind,
    pub weight: f64,
    pub detail: String,
}

pub struct RiskScorer {
    geographic_mismatch: f64,
    high_velocity: f64,
    critical_velocity: f64,
    suspicious_amount: f64,
    rapid_succession: f64,
    statistical_outlier: f64,
    proxy_or_datacenter: f64,
    suspicious_amounts: HashSet<u64>,
    proxy_indicators: Vec<String>,
    anomaly_threshold: f64,
    velocity_high: usize,
    velocity_critical: usize,
    rapid_succession_secs: i64,
    score_cap: f64,
}

impl RiskScorer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            geographic_mismatch: config.weights.geographic_mismatch,
            high_velocity: config.weights.high_velocity,
            critical_velocity: config.weights.critical_velocity,
            suspicious_amount: config.weights.suspicious_amount,
            rapid_succession: config.weights.rapid_succession,
            statistical_outlier: config.weights.statistical_outlier,
            proxy_or_datacenter: config.weights.proxy_or_datacenter,
            suspicious_amounts: config.suspicious_amounts.iter().copied().collect(),
            proxy_indicators: config
                .proxy_indicators
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            anomaly_threshold: config.anomaly.threshold,
            velocity_high: config.velocity.high,
            velocity_critical: config.velocity.critical,
            rapid_succession_secs: config.velocity.rapid_succession_secs,
            score_cap: config.score_cap,
        }
    }

    /// Evaluate every factor in the documented order, sum the triggered
    /// weights, cap, and return the ordered factor list alongside.
    pub fn score(
        &self,
        txn: &Transaction,
        geo: &GeoFacts,
        velocity: &VelocitySnapshot,
        anomaly_score: f64,
    ) -> (f64, Vec<RiskFactor>) {
        let mut factors = Vec::new();

        // 1. Geographic mismatch. Billing-vs-IP and BIN-vs-IP are
        //    independent signals; both contribute when both trigger.
        if let (Some(billing), Some(ip_country)) = (&txn.billing_country, &geo.country) {
            if billing != ip_country {
                factors.push(RiskFactor {
                    kind: FactorKind::GeographicMismatch,
                    weight: self.geographic_mismatch,
                    detail: format!("billing country {billing} differs from IP country {ip_country}"),
                });
            }
        }
        if let (Some(bin), Some(ip_country)) = (&txn.bin_country, &geo.country) {
            if bin != ip_country {
                factors.push(RiskFactor {
                    kind: FactorKind::GeographicMismatch,
                    weight: self.geographic_mismatch,
                    detail: format!("BIN country {bin} differs from IP country {ip_country}"),
                });
            }
        }

        // 2. Velocity, strict `>` on the prior count in the window.
        if velocity.count_in_window > self.velocity_high {
            factors.push(RiskFactor {
                kind: FactorKind::HighVelocity,
                weight: self.high_velocity,
                detail: format!(
                    "{} prior transactions within {}s",
                    velocity.count_in_window, velocity.window_secs
                ),
            });
        }
        if velocity.count_in_window > self.velocity_critical {
            factors.push(RiskFactor {
                kind: FactorKind::CriticalVelocity,
                weight: self.critical_velocity,
                detail: format!(
                    "{} prior transactions within {}s exceeds the critical threshold",
                    velocity.count_in_window, velocity.window_secs
                ),
            });
        }

        // 3. Known test/fraud amounts.
        if let Some(amount) = txn.amount {
            if self.suspicious_amounts.contains(&amount) {
                factors.push(RiskFactor {
                    kind: FactorKind::SuspiciousAmount,
                    weight: self.suspicious_amount,
                    detail: format!("amount {amount} is a known suspicious amount"),
                });
            }
        }

        // 4. Rapid succession.
        if let Some(gap) = velocity.since_previous_secs {
            if gap < self.rapid_succession_secs {
                factors.push(RiskFactor {
                    kind: FactorKind::RapidSuccession,
                    weight: self.rapid_succession,
                    detail: format!("previous transaction only {gap}s earlier"),
                });
            }
        }

        // 5. Statistical outlier against the batch distribution.
        if anomaly_score.abs() > self.anomaly_threshold {
            factors.push(RiskFactor {
                kind: FactorKind::StatisticalOutlier,
                weight: self.statistical_outlier,
                detail: format!("anomaly score {anomaly_score:.2} exceeds {}", self.anomaly_threshold),
            });
        }

        // 6. Proxy / VPN / datacenter egress.
        if let Some(indicator) = self.proxy_signal(geo) {
            factors.push(RiskFactor {
                kind: FactorKind::ProxyOrDatacenter,
                weight: self.proxy_or_datacenter,
                detail: indicator,
            });
        }

        let total: f64 = factors.iter().map(|f| f.weight).sum();
        (total.min(self.score_cap), factors)
    }

    fn proxy_signal(&self, geo: &GeoFacts) -> Option<String> {
        if geo.is_proxy {
            return Some("resolver flagged the IP as a proxy".into());
        }
        for field in [&geo.org, &geo.asn] {
            if let Some(value) = field {
                let lowered = value.to_ascii_lowercase();
                if let Some(hit) = self.proxy_indicators.iter().find(|ind| lowered.contains(ind.as_str())) {
                    return Some(format!("network '{value}' matches proxy indicator '{hit}'"));
                }
            }
        }
        None
    }
}
