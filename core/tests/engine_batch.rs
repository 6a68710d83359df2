//! End-to-end batch scoring: the worked scenarios, one-assessment-per-row,
//! resolver memoization and degradation, and the batch report.

use payrisk_core::classifier::RiskLevel;
use payrisk_core::config::EngineConfig;
use payrisk_core::engine::ScoringEngine;
use payrisk_core::geo::{GeoError, GeoFacts, GeoResolver, StaticGeoResolver};
use payrisk_core::report::BatchReport;
use payrisk_core::scorer::FactorKind;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn pl_resolver() -> StaticGeoResolver {
    StaticGeoResolver::new().with_entry(
        "203.0.113.5",
        GeoFacts {
            country: Some("PL".into()),
            continent: Some("EU".into()),
            asn: Some("AS5617".into()),
            org: Some("Orange Polska".into()),
            is_proxy: false,
        },
    )
}

fn engine(resolver: Arc<dyn GeoResolver>) -> ScoringEngine {
    ScoringEngine::new(EngineConfig::default(), resolver).unwrap()
}

/// The busy-user scenario: billing RO, IP resolving to PL, six prior
/// transactions in the last hour, a suspicious amount, and a two-minute
/// gap. Composite 8.0, HIGH, four factors in evaluation order.
fn busy_user_batch() -> Vec<Value> {
    let mut rows: Vec<Value> = (0..6)
        .map(|i| {
            json!({
                "id": format!("prior-{i}"),
                "user_email": "maria@example.test",
                "amount": 1000,
                "status": "success",
                "created_at": format!("2026-03-01T12:{:02}:00Z", i * 9),
                "billing_country": "RO",
            })
        })
        .collect();
    rows.push(json!({
        "id": "target",
        "user_email": "maria@example.test",
        "amount": 5000,
        "status": "success",
        "created_at": "2026-03-01T12:47:00Z",
        "billing_country": "RO",
        "ip": "203.0.113.5",
    }));
    rows
}

#[test]
fn busy_user_scenario_scores_high() {
    let engine = engine(Arc::new(pl_resolver()));
    let assessments = engine.assess_batch(&busy_user_batch()).unwrap();

    assert_eq!(assessments.len(), 7);

    let target = &assessments[6];
    assert_eq!(target.transaction_id, "target");
    assert_eq!(target.composite_score, 8.0);
    assert_eq!(target.risk_level, RiskLevel::High);
    assert_eq!(
        target.factors.iter().map(|f| f.kind).collect::<Vec<_>>(),
        vec![
            FactorKind::GeographicMismatch,
            FactorKind::HighVelocity,
            FactorKind::SuspiciousAmount,
            FactorKind::RapidSuccession,
        ]
    );
    assert_eq!(target.velocity.count_in_window, 6);
    assert_eq!(target.velocity.since_previous_secs, Some(120));
    assert_eq!(target.geo.country.as_deref(), Some("PL"));

    // The priors stay quiet: unknown IP country never mismatches, and
    // none of them crosses a velocity threshold.
    for prior in &assessments[..6] {
        assert_eq!(prior.composite_score, 0.0, "{}", prior.transaction_id);
        assert_eq!(prior.risk_level, RiskLevel::Low);
    }
}

/// A record with nothing known still produces a complete, quiet
/// assessment.
#[test]
fn fully_unknown_record_scores_zero() {
    let engine = engine(Arc::new(StaticGeoResolver::new()));
    let assessments = engine.assess_batch(&[json!({})]).unwrap();

    assert_eq!(assessments.len(), 1);
    let a = &assessments[0];
    assert_eq!(a.transaction_id, "row-0");
    assert_eq!(a.composite_score, 0.0);
    assert_eq!(a.risk_level, RiskLevel::Low);
    assert!(a.factors.is_empty());
    assert!(a.geo.is_unknown());
    assert_eq!(a.velocity.count_in_window, 0);
}

#[test]
fn one_assessment_per_row_in_input_order() {
    let rows = vec![
        json!({ "id": "c", "user_email": "x@t.test", "created_at": "2026-03-01T10:00:00Z", "amount": 10 }),
        json!({ "id": "a", "user_email": "y@t.test", "created_at": "2026-03-01T09:00:00Z", "amount": 20 }),
        json!({ "id": "b" }),
        json!({ "id": "d", "user_email": "x@t.test", "created_at": "2026-03-01T09:30:00Z", "amount": 30 }),
    ];

    let engine = engine(Arc::new(StaticGeoResolver::new()));
    let assessments = engine.assess_batch(&rows).unwrap();

    let ids: Vec<&str> = assessments.iter().map(|a| a.transaction_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b", "d"]);
}

/// Input arriving newest-first for one user is still processed in
/// chronological order internally.
#[test]
fn out_of_order_input_is_sorted_per_user() {
    let rows = vec![
        json!({ "id": "late", "user_email": "x@t.test", "created_at": "2026-03-01T10:10:00Z", "amount": 10 }),
        json!({ "id": "early", "user_email": "x@t.test", "created_at": "2026-03-01T10:00:00Z", "amount": 10 }),
    ];

    let engine = engine(Arc::new(StaticGeoResolver::new()));
    let assessments = engine.assess_batch(&rows).unwrap();

    assert_eq!(assessments[0].transaction_id, "late");
    assert_eq!(assessments[0].velocity.count_in_window, 1);
    assert_eq!(assessments[0].velocity.since_previous_secs, Some(600));
    assert_eq!(assessments[1].velocity.count_in_window, 0);
}

struct CountingResolver {
    inner: StaticGeoResolver,
    calls: AtomicUsize,
}

impl GeoResolver for CountingResolver {
    fn resolve(&self, ip: &str) -> Result<GeoFacts, GeoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(ip)
    }
}

/// Each distinct IP hits the resolver exactly once per batch, whatever
/// the row count.
#[test]
fn distinct_ips_resolved_once() {
    let resolver = Arc::new(CountingResolver {
        inner: pl_resolver(),
        calls: AtomicUsize::new(0),
    });
    let engine = engine(resolver.clone());

    let rows: Vec<Value> = (0..10)
        .map(|i| {
            let ip = if i % 2 == 0 { "203.0.113.5" } else { "198.51.100.20" };
            json!({ "id": format!("t-{i}"), "ip": ip, "amount": 100 })
        })
        .collect();

    engine.assess_batch(&rows).unwrap();
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}

struct FailingResolver;

impl GeoResolver for FailingResolver {
    fn resolve(&self, ip: &str) -> Result<GeoFacts, GeoError> {
        Err(GeoError::Timeout(ip.to_string()))
    }
}

/// Resolver timeouts degrade to unknown facts; the batch still completes
/// and no geographic factor fires.
#[test]
fn resolver_failure_degrades_to_unknown() {
    let engine = engine(Arc::new(FailingResolver));
    let rows = vec![json!({
        "id": "t-0",
        "ip": "203.0.113.5",
        "billing_country": "RO",
        "amount": 100,
    })];

    let assessments = engine.assess_batch(&rows).unwrap();
    assert!(assessments[0].geo.is_unknown());
    assert_eq!(assessments[0].composite_score, 0.0);
}

/// Syntactically invalid IPs are an unresolved condition, not an error.
#[test]
fn invalid_ip_syntax_degrades_to_unknown() {
    let engine = engine(Arc::new(pl_resolver()));
    let rows = vec![json!({ "id": "t-0", "ip": "not-an-ip", "amount": 100 })];

    let assessments = engine.assess_batch(&rows).unwrap();
    assert!(assessments[0].geo.is_unknown());
}

/// Records without a user key never accrue velocity, however many there
/// are and however close together.
#[test]
fn unknown_user_never_accrues_velocity() {
    let rows: Vec<Value> = (0..8)
        .map(|i| {
            json!({
                "id": format!("t-{i}"),
                "amount": 100,
                "created_at": format!("2026-03-01T12:00:{:02}Z", i),
            })
        })
        .collect();

    let engine = engine(Arc::new(StaticGeoResolver::new()));
    let assessments = engine.assess_batch(&rows).unwrap();

    for a in &assessments {
        assert_eq!(a.velocity.count_in_window, 0);
        assert_eq!(a.velocity.since_previous_secs, None);
        assert!(a.factors.is_empty());
    }
}

#[test]
fn batch_report_aggregates() {
    let engine = engine(Arc::new(pl_resolver()));
    let assessments = engine.assess_batch(&busy_user_batch()).unwrap();
    let report = BatchReport::from_assessments(&assessments);

    assert_eq!(report.total_transactions, 7);
    assert_eq!(report.high_risk, 1);
    assert_eq!(report.critical_risk, 0);
    assert_eq!(report.geographic_mismatches, 1);
    assert_eq!(report.velocity_violations, 1);
    assert_eq!(report.factor_counts.get(&FactorKind::GeographicMismatch), Some(&1));
    assert_eq!(report.factor_counts.get(&FactorKind::HighVelocity), Some(&1));
    assert_eq!(report.factor_counts.get(&FactorKind::SuspiciousAmount), Some(&1));
    assert_eq!(report.factor_counts.get(&FactorKind::RapidSuccession), Some(&1));
    assert!((report.mean_score - 8.0 / 7.0).abs() < 1e-9);

    assert_eq!(report.top_users.len(), 1);
    assert_eq!(report.top_users[0].user_key, "maria@example.test");
    assert_eq!(report.top_users[0].transaction_count, 7);
    assert_eq!(report.top_users[0].total_score, 8.0);
}
