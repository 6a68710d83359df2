//! Engine configuration.
//!
//! Every threshold, weight, and boundary the scoring pipeline uses lives
//! here as an explicit, validated structure. Invalid configuration is a
//! fatal startup error — nothing is scored until `validate()` passes.

use crate::anomaly::AnomalyMethod;
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

// ── Velocity ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Sliding window horizon, in seconds.
    pub window_secs: i64,
    /// Prior-count threshold for HIGH_VELOCITY (strict `>`).
    pub high: usize,
    /// Prior-count threshold for CRITICAL_VELOCITY (strict `>`).
    pub critical: usize,
    /// Back-to-back gap threshold for RAPID_SUCCESSION, in seconds.
    pub rapid_succession_secs: i64,
    /// Optional count horizon — oldest entries beyond this are dropped even
    /// when still inside the time window.
    pub max_entries: Option<usize>,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            window_secs: 3_600,
            high: 5,
            critical: 10,
            rapid_succession_secs: 300,
            max_entries: None,
        }
    }
}

// ── Anomaly detection ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub method: AnomalyMethod,
    /// A transaction is a STATISTICAL_OUTLIER when |score| exceeds this.
    pub threshold: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            method: AnomalyMethod::ZScore,
            threshold: 3.0,
        }
    }
}

// ── Factor weights ───────────────────────────────────────────────────────────

/// Point contribution per triggered factor. One table instead of scattered
/// literals so each factor is independently testable and overridable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub geographic_mismatch: f64,
    pub high_velocity: f64,
    pub critical_velocity: f64,
    pub suspicious_amount: f64,
    pub rapid_succession: f64,
    pub statistical_outlier: f64,
    pub proxy_or_datacenter: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            geographic_mismatch: 3.0,
            high_velocity: 2.0,
            critical_velocity: 2.0,
            suspicious_amount: 2.0,
            rapid_succession: 1.0,
            statistical_outlier: 1.5,
            proxy_or_datacenter: 2.5,
        }
    }
}

impl FactorWeights {
    fn as_pairs(&self) -> [(&'static str, f64); 7] {
        [
            ("geographic_mismatch", self.geographic_mismatch),
            ("high_velocity", self.high_velocity),
            ("critical_velocity", self.critical_velocity),
            ("suspicious_amount", self.suspicious_amount),
            ("rapid_succession", self.rapid_succession),
            ("statistical_outlier", self.statistical_outlier),
            ("proxy_or_datacenter", self.proxy_or_datacenter),
        ]
    }
}

// ── Risk-level boundaries ────────────────────────────────────────────────────

/// Ascending lower bounds. LOW is [0, medium), MEDIUM is [medium, high),
/// HIGH is [high, critical), CRITICAL is [critical, cap].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBoundaries {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskBoundaries {
    fn default() -> Self {
        Self {
            medium: 5.0,
            high: 8.0,
            critical: 11.0,
        }
    }
}

// ── Engine config ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub velocity: VelocityConfig,
    pub anomaly: AnomalyConfig,
    pub weights: FactorWeights,
    pub boundaries: RiskBoundaries,
    /// Known test/fraud amounts, in minor units.
    pub suspicious_amounts: Vec<u64>,
    /// Substrings matched (case-insensitively) against the resolved
    /// organization and ASN to flag proxy/VPN/datacenter egress.
    pub proxy_indicators: Vec<String>,
    /// Composite scores are capped here after summing factor weights.
    pub score_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            velocity: VelocityConfig::default(),
            anomaly: AnomalyConfig::default(),
            weights: FactorWeights::default(),
            boundaries: RiskBoundaries::default(),
            suspicious_amounts: vec![470, 1978, 1979, 2000, 5000],
            proxy_indicators: vec![
                "vpn".into(),
                "proxy".into(),
                "tor".into(),
                "anonymous".into(),
                "data center".into(),
                "hosting".into(),
            ],
            score_cap: 10.0,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Absent keys fall back to the defaults above.
    /// The loaded config is validated before being returned.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject every configuration the pipeline cannot score under.
    /// Called once at engine construction, before any transaction is seen.
    pub fn validate(&self) -> EngineResult<()> {
        let fail = |reason: String| Err(EngineError::Config { reason });

        if !(self.score_cap > 0.0 && self.score_cap.is_finite()) {
            return fail(format!("score_cap must be positive, got {}", self.score_cap));
        }
        if self.velocity.window_secs <= 0 {
            return fail(format!(
                "velocity.window_secs must be positive, got {}",
                self.velocity.window_secs
            ));
        }
        if self.velocity.rapid_succession_secs < 0 {
            return fail(format!(
                "velocity.rapid_succession_secs must be non-negative, got {}",
                self.velocity.rapid_succession_secs
            ));
        }
        if self.velocity.critical < self.velocity.high {
            return fail(format!(
                "velocity.critical ({}) must be >= velocity.high ({})",
                self.velocity.critical, self.velocity.high
            ));
        }
        if self.velocity.max_entries == Some(0) {
            return fail("velocity.max_entries must be at least 1 when set".into());
        }
        if !(self.anomaly.threshold >= 0.0 && self.anomaly.threshold.is_finite()) {
            return fail(format!(
                "anomaly.threshold must be non-negative, got {}",
                self.anomaly.threshold
            ));
        }
        for (name, weight) in self.weights.as_pairs() {
            if !(weight >= 0.0 && weight.is_finite()) {
                return fail(format!("weights.{name} must be non-negative, got {weight}"));
            }
        }

        // Boundaries must be strictly ascending so every score maps to
        // exactly one level — overlap or inversion is never silently fixed.
        let b = &self.boundaries;
        if !(b.medium > 0.0 && b.high > b.medium && b.critical > b.high) {
            return fail(format!(
                "risk boundaries must be strictly ascending and positive, \
                 got medium={} high={} critical={}",
                b.medium, b.high, b.critical
            ));
        }

        Ok(())
    }
}
