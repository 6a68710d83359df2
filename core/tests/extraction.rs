//! Field extraction: candidate-path priority, nested blob probing, soft
//! failure to unknown, and the matched-path audit trail.

use payrisk_core::extractor::FieldExtractor;
use payrisk_core::transaction::TxnStatus;
use serde_json::json;

#[test]
fn top_level_fields_extracted() {
    let row = json!({
        "id": "txn-100",
        "amount": 1978,
        "currency": "eur",
        "status": "success",
        "created_at": "2026-03-01T12:00:00Z",
        "user_email": "Alice@Example.COM",
        "billing_country": "de",
        "ip": "203.0.113.9",
    });

    let extraction = FieldExtractor::new().extract(&row, 0);
    let txn = &extraction.transaction;

    assert_eq!(txn.id, "txn-100");
    assert_eq!(txn.amount, Some(1978));
    assert_eq!(txn.currency.as_deref(), Some("EUR"));
    assert_eq!(txn.status, TxnStatus::Success);
    assert!(txn.timestamp.is_some());
    assert_eq!(txn.user_key.as_deref(), Some("alice@example.com"));
    assert_eq!(txn.billing_country.as_deref(), Some("DE"));
    assert_eq!(txn.payer_ip.as_deref(), Some("203.0.113.9"));
}

/// Earlier candidates win over later ones, and the audit trail records
/// which path supplied the value.
#[test]
fn candidate_priority_and_audit_trail() {
    let row = json!({
        "ip": "198.51.100.1",
        "client_ip": "203.0.113.50",
    });

    let extraction = FieldExtractor::new().extract(&row, 0);

    assert_eq!(
        extraction.transaction.payer_ip.as_deref(),
        Some("198.51.100.1"),
        "the first candidate path must win"
    );
    assert_eq!(
        extraction.matched_paths.get("payer_ip").map(String::as_str),
        Some("ip")
    );
}

/// Values buried in a JSON blob column are found through the same
/// candidate tables, and the recorded path names the blob.
#[test]
fn nested_blob_paths_probed() {
    let body = r#"{"billing":{"country":"de"},"initiator":{"ip_address":"9.9.9.9"},"email":"bob@shop.test"}"#;
    let row = json!({
        "id": "txn-7",
        "body": body,
    });

    let extraction = FieldExtractor::new().extract(&row, 0);
    let txn = &extraction.transaction;

    assert_eq!(txn.billing_country.as_deref(), Some("DE"));
    assert_eq!(txn.payer_ip.as_deref(), Some("9.9.9.9"));
    assert_eq!(txn.user_key.as_deref(), Some("bob@shop.test"));
    assert_eq!(
        extraction.matched_paths.get("billing_country").map(String::as_str),
        Some("body.billing.country")
    );
}

/// x-forwarded-for may carry a proxy chain; the first entry is the client.
#[test]
fn forwarded_for_keeps_first_entry() {
    let row = json!({
        "headers": { "x-forwarded-for": "203.0.113.7, 10.0.0.1, 10.0.0.2" },
    });

    let extraction = FieldExtractor::new().extract(&row, 0);
    assert_eq!(extraction.transaction.payer_ip.as_deref(), Some("203.0.113.7"));
}

/// Missing or malformed fields degrade to unknown. Nothing panics, nothing
/// is defaulted to a guessed value.
#[test]
fn malformed_fields_degrade_to_unknown() {
    let row = json!({
        "amount": "not-a-number",
        "created_at": "yesterday-ish",
        "billing_country": "12",
        "bin_country": "",
    });

    let extraction = FieldExtractor::new().extract(&row, 3);
    let txn = &extraction.transaction;

    assert_eq!(txn.id, "row-3", "missing id falls back to the row ordinal");
    assert_eq!(txn.amount, None);
    assert_eq!(txn.timestamp, None);
    assert_eq!(txn.billing_country, None, "digits are not a country");
    assert_eq!(txn.bin_country, None);
    assert_eq!(txn.status, TxnStatus::Other);
    assert_eq!(txn.user_key, None);
}

#[test]
fn negative_and_fractional_amounts_are_unknown() {
    let negative = json!({ "amount": -500 });
    let fractional = json!({ "amount": 19.99 });
    let integral_float = json!({ "amount": 47.0 });

    let extractor = FieldExtractor::new();
    assert_eq!(extractor.extract(&negative, 0).transaction.amount, None);
    assert_eq!(extractor.extract(&fractional, 0).transaction.amount, None);
    assert_eq!(extractor.extract(&integral_float, 0).transaction.amount, Some(47));
}

#[test]
fn missing_markers_are_treated_as_absent() {
    let row = json!({
        "ip": "nan",
        "billing_country": "None",
        "user_email": "  ",
    });

    let extraction = FieldExtractor::new().extract(&row, 0);
    let txn = &extraction.transaction;

    assert_eq!(txn.payer_ip, None);
    assert_eq!(txn.billing_country, None);
    assert_eq!(txn.user_key, None);
}

#[test]
fn status_vocabulary() {
    let extractor = FieldExtractor::new();
    for (raw, expected) in [
        ("Failed", TxnStatus::Failed),
        ("declined", TxnStatus::Failed),
        ("success", TxnStatus::Success),
        ("Approved", TxnStatus::Success),
        ("pending", TxnStatus::Other),
    ] {
        let row = json!({ "status": raw });
        assert_eq!(
            extractor.extract(&row, 0).transaction.status,
            expected,
            "status {raw:?}"
        );
    }
}

#[test]
fn device_facts_collected() {
    let body = r#"{"browser":{"name":"Firefox","version":"128.0","language":"de-DE"},"device":{"timezone":"Europe/Berlin"},"processing_time":812}"#;
    let row = json!({ "body": body, "card_brand": "visa" });

    let extraction = FieldExtractor::new().extract(&row, 0);
    let device = &extraction.transaction.device;

    assert_eq!(device.get("browser").map(String::as_str), Some("Firefox"));
    assert_eq!(device.get("browser_version").map(String::as_str), Some("128.0"));
    assert_eq!(device.get("language").map(String::as_str), Some("de-DE"));
    assert_eq!(device.get("timezone").map(String::as_str), Some("Europe/Berlin"));
    assert_eq!(device.get("card_brand").map(String::as_str), Some("visa"));
    assert_eq!(device.get("processing_ms").map(String::as_str), Some("812"));
}

/// Epoch-seconds timestamps are accepted alongside the string formats.
#[test]
fn numeric_timestamp_parsed() {
    let row = json!({ "created_at": 1_767_225_600 });
    let extraction = FieldExtractor::new().extract(&row, 0);
    assert!(extraction.transaction.timestamp.is_some());
}
