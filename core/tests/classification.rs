//! Risk-level classification: the default boundaries partition the score
//! range with no gaps or overlaps, and invalid boundaries are fatal.

use payrisk_core::classifier::{RiskClassifier, RiskLevel};
use payrisk_core::config::{EngineConfig, RiskBoundaries};
use payrisk_core::engine::ScoringEngine;
use payrisk_core::error::EngineError;
use payrisk_core::geo::StaticGeoResolver;
use std::sync::Arc;

#[test]
fn default_boundaries_map_as_documented() {
    let classifier = RiskClassifier::new(&RiskBoundaries::default()).unwrap();

    assert_eq!(classifier.classify(0.0), RiskLevel::Low);
    assert_eq!(classifier.classify(4.99), RiskLevel::Low);
    assert_eq!(classifier.classify(5.0), RiskLevel::Medium);
    assert_eq!(classifier.classify(7.99), RiskLevel::Medium);
    assert_eq!(classifier.classify(8.0), RiskLevel::High);
    assert_eq!(classifier.classify(10.0), RiskLevel::High);
    assert_eq!(classifier.classify(11.0), RiskLevel::Critical);
    assert_eq!(classifier.classify(15.0), RiskLevel::Critical);
}

/// Sweep [0, cap] — every score lands in exactly one level and the level
/// sequence is non-decreasing, so the bands cannot gap or overlap.
#[test]
fn bands_partition_the_score_range() {
    let classifier = RiskClassifier::new(&RiskBoundaries::default()).unwrap();
    let cap = EngineConfig::default().score_cap;

    let mut previous = RiskLevel::Low;
    let mut step = 0;
    while (step as f64) * 0.01 <= cap {
        let level = classifier.classify(step as f64 * 0.01);
        assert!(level >= previous, "levels regressed at score {}", step as f64 * 0.01);
        previous = level;
        step += 1;
    }
}

#[test]
fn equal_boundaries_are_rejected() {
    let result = RiskClassifier::new(&RiskBoundaries {
        medium: 5.0,
        high: 5.0,
        critical: 11.0,
    });
    assert!(matches!(result, Err(EngineError::Config { .. })));
}

#[test]
fn inverted_boundaries_are_rejected() {
    let result = RiskClassifier::new(&RiskBoundaries {
        medium: 8.0,
        high: 5.0,
        critical: 11.0,
    });
    assert!(matches!(result, Err(EngineError::Config { .. })));
}

/// Bad configuration is fatal at engine construction, before any
/// transaction is processed.
#[test]
fn engine_rejects_invalid_configuration_up_front() {
    let mut config = EngineConfig::default();
    config.boundaries.critical = 1.0;

    let result = ScoringEngine::new(config, Arc::new(StaticGeoResolver::new()));
    assert!(matches!(result, Err(EngineError::Config { .. })));

    let mut config = EngineConfig::default();
    config.velocity.critical = 2; // below velocity.high
    let result = ScoringEngine::new(config, Arc::new(StaticGeoResolver::new()));
    assert!(matches!(result, Err(EngineError::Config { .. })));

    let mut config = EngineConfig::default();
    config.weights.rapid_succession = -1.0;
    let result = ScoringEngine::new(config, Arc::new(StaticGeoResolver::new()));
    assert!(matches!(result, Err(EngineError::Config { .. })));
}
