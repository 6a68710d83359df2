//! The batch scoring engine — orchestrates the full pipeline.
//!
//! PIPELINE ORDER (fixed, documented, never reordered):
//!   1. Extract every raw record into a Transaction (FieldExtractor).
//!   2. Resolve payer IPs through the memoized GeoCache — each distinct IP
//!      hits the resolver at most once per batch.
//!   3. Compute batch-wide anomaly scores per numeric column.
//!   4. Partition by user key, sort each partition by timestamp, and score
//!      partitions in parallel. Velocity state is scoped per user, so
//!      cross-partition order does not matter; within one user the
//!      processing stays strictly sequential and timestamp-ordered.
//!   5. Reassemble assessments into input order.
//!
//! RULES:
//!   - The batch always completes: one assessment per input record, even
//!     when every field of a record is unknown.
//!   - Identical input and configuration produce identical output. There
//!     is no randomness anywhere in the pipeline.

use crate::{
    anomaly,
    assessment::RiskAssessment,
    classifier::RiskClassifier,
    config::EngineConfig,
    error::EngineResult,
    extractor::{Extraction, FieldExtractor},
    geo::{GeoCache, GeoFacts, GeoResolver},
    scorer::RiskScorer,
    velocity::{VelocitySnapshot, VelocityTracker},
};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ScoringEngine {
    config: EngineConfig,
    extractor: FieldExtractor,
    scorer: RiskScorer,
    classifier: RiskClassifier,
    resolver: Arc<dyn GeoResolver>,
}

impl ScoringEngine {
    /// Build an engine over a validated configuration. Invalid
    /// configuration is rejected here, before any transaction is seen.
    pub fn new(config: EngineConfig, resolver: Arc<dyn GeoResolver>) -> EngineResult<Self> {
        config.validate()?;
        let classifier = RiskClassifier::new(&config.boundaries)?;
        let scorer = RiskScorer::new(&config);
        Ok(Self {
            config,
            extractor: FieldExtractor::new(),
            scorer,
            classifier,
            resolver,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score one batch of raw records. Returns exactly one assessment per
    /// input row, in input order.
    pub fn assess_batch(&self, rows: &[Value]) -> EngineResult<Vec<RiskAssessment>> {
        // 1. Extraction.
        let extractions: Vec<Extraction> = rows
            .iter()
            .enumerate()
            .map(|(ordinal, row)| self.extractor.extract(row, ordinal))
            .collect();

        // 2. Geo resolution, memoized per distinct IP.
        let cache = GeoCache::new(self.resolver.clone());
        let geo: Vec<GeoFacts> = extractions
            .iter()
            .map(|e| {
                e.transaction
                    .payer_ip
                    .as_deref()
                    .map(|ip| cache.lookup(ip))
                    .unwrap_or_else(GeoFacts::unknown)
            })
            .collect();

        // 3. Batch-wide anomaly statistics. The amount column is always
        //    scored; processing time participates when the payload carried
        //    it. The scorer consumes the larger magnitude.
        let anomaly_scores = self.anomaly_scores(&extractions);

        // 4. Per-user partitions, chronological within each partition.
        //    Records without a user key cannot accrue velocity and each
        //    form their own singleton partition.
        let partitions = partition_by_user(&extractions);
        let scored: EngineResult<Vec<Vec<(usize, RiskAssessment)>>> = partitions
            .par_iter()
            .map(|partition| self.score_partition(partition, &extractions, &geo, &anomaly_scores))
            .collect();

        // 5. Back to input order.
        let mut flat: Vec<(usize, RiskAssessment)> = scored?.into_iter().flatten().collect();
        flat.sort_by_key(|(ordinal, _)| *ordinal);
        Ok(flat.into_iter().map(|(_, assessment)| assessment).collect())
    }

    fn anomaly_scores(&self, extractions: &[Extraction]) -> Vec<f64> {
        let method = self.config.anomaly.method;

        let amounts: Vec<Option<f64>> = extractions
            .iter()
            .map(|e| e.transaction.amount.map(|a| a as f64))
            .collect();
        let amount_scores = anomaly::score_column(&amounts, method);

        let processing: Vec<Option<f64>> = extractions
            .iter()
            .map(|e| {
                e.transaction
                    .device
                    .get("processing_ms")
                    .and_then(|raw| raw.parse::<f64>().ok())
            })
            .collect();
        if processing.iter().all(Option::is_none) {
            return amount_scores;
        }
        let processing_scores = anomaly::score_column(&processing, method);

        amount_scores
            .into_iter()
            .zip(processing_scores)
            .map(|(a, p)| if p.abs() > a.abs() { p } else { a })
            .collect()
    }

    /// Score one user partition sequentially, in timestamp order, with its
    /// own velocity state.
    fn score_partition(
        &self,
        partition: &[usize],
        extractions: &[Extraction],
        geo: &[GeoFacts],
        anomaly_scores: &[f64],
    ) -> EngineResult<Vec<(usize, RiskAssessment)>> {
        let mut tracker = VelocityTracker::new(&self.config.velocity);
        let mut out = Vec::with_capacity(partition.len());

        for &ordinal in partition {
            let txn = &extractions[ordinal].transaction;
            let snapshot = match (txn.user_key.as_deref(), txn.timestamp) {
                (Some(user), Some(ts)) => tracker.observe(user, ts, txn.amount)?,
                _ => VelocitySnapshot::empty(self.config.velocity.window_secs),
            };

            let (composite_score, factors) =
                self.scorer
                    .score(txn, &geo[ordinal], &snapshot, anomaly_scores[ordinal]);

            out.push((
                ordinal,
                RiskAssessment {
                    transaction_id: txn.id.clone(),
                    user_key: txn.user_key.clone(),
                    composite_score,
                    risk_level: self.classifier.classify(composite_score),
                    factors,
                    geo: geo[ordinal].clone(),
                    velocity: snapshot,
                },
            ));
        }

        Ok(out)
    }
}

/// Group row ordinals by user key. Keyed partitions come out in user-key
/// order and each is sorted chronologically (ties keep input order), which
/// both satisfies the velocity precondition and keeps runs reproducible.
fn partition_by_user(extractions: &[Extraction]) -> Vec<Vec<usize>> {
    let mut keyed: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut singletons: Vec<Vec<usize>> = Vec::new();

    for (ordinal, extraction) in extractions.iter().enumerate() {
        match extraction.transaction.user_key.as_deref() {
            Some(user) => keyed.entry(user).or_default().push(ordinal),
            None => singletons.push(vec![ordinal]),
        }
    }

    let mut partitions: Vec<Vec<usize>> = keyed.into_values().collect();
    for partition in &mut partitions {
        partition.sort_by_key(|&ordinal| (extractions[ordinal].transaction.timestamp, ordinal));
    }
    partitions.extend(singletons);
    partitions
}
