//! Field extraction from semi-structured transaction payloads.
//!
//! One raw record is a nested key/value structure of unknown completeness:
//! the same semantic value may live under several different names, at the
//! top level or buried inside a JSON blob column. Extraction:
//!   1. Each semantic field declares an ordered candidate-path table.
//!   2. One generic routine resolves dot-paths, case-insensitively, against
//!      the row and then against each parsed blob column.
//!   3. The first valid match wins and the matched path is recorded, so a
//!      reviewer can always answer "where did this value come from".
//!
//! Extraction fails soft: a missing or malformed field becomes unknown and
//! the row still produces a transaction. No value is ever fabricated.

use crate::transaction::{Transaction, TxnStatus};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::warn;
use serde_json::Value;
use std::collections::BTreeMap;

// ── Candidate paths ──────────────────────────────────────────────────────────

/// Columns that may hold a JSON document as a string.
const JSON_BLOB_COLUMNS: &[&str] = &["body", "request_payload", "response_payload"];

const ID_PATHS: &[&str] = &["id", "transaction_id", "txn_id", "payment_id"];
const USER_KEY_PATHS: &[&str] = &[
    "user_email",
    "email",
    "user.email",
    "customer.email",
    "buyer.email",
    "contact.email",
];
const AMOUNT_PATHS: &[&str] = &["amount", "amount_minor", "total_amount"];
const CURRENCY_PATHS: &[&str] = &["currency", "currency_code", "amount_currency"];
const TIMESTAMP_PATHS: &[&str] = &["created_at", "timestamp", "created", "t.created_at"];
const STATUS_PATHS: &[&str] = &["status", "status_title", "state"];
const BILLING_COUNTRY_PATHS: &[&str] = &[
    "billing_country",
    "billing.country",
    "billing.address.country",
    "address.country",
];
const BIN_COUNTRY_PATHS: &[&str] = &[
    "bin_country",
    "bin_country_iso",
    "issuer_country",
    "ci.bin_country_iso",
];
const IP_PATHS: &[&str] = &[
    "ip",
    "client_ip",
    "t.ip",
    "headers.x-forwarded-for",
    "initiator.ip_address",
    "ip_from_body",
];

/// Auxiliary device/browser/card facts, keyed by the name they get in
/// `Transaction::device`.
const AUX_PATHS: &[(&str, &[&str])] = &[
    ("browser", &["browser.name", "browser_name", "browser"]),
    ("browser_version", &["browser.version", "browser_version"]),
    ("os", &["device.os", "os_name", "os"]),
    (
        "language",
        &[
            "accept_language",
            "accept-language",
            "headers.accept-language",
            "browser.language",
            "language",
        ],
    ),
    (
        "timezone",
        &["timezone", "device.timezone", "browser.timezone"],
    ),
    (
        "screen_resolution",
        &["screen_resolution", "device.screen_resolution", "screen.resolution"],
    ),
    ("card_brand", &["card_brand", "card.brand", "ci.brand"]),
    ("card_type", &["card_type", "card.type", "ci.type"]),
    (
        "device_id",
        &["device_id", "device.id", "fingerprint", "device.fingerprint"],
    ),
    (
        "processing_ms",
        &["processing_time", "processing_ms", "duration_ms"],
    ),
];

// ── Output ───────────────────────────────────────────────────────────────────

/// One extracted transaction plus the audit trail of which candidate path
/// supplied each field.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub transaction: Transaction,
    pub matched_paths: BTreeMap<String, String>,
}

// ── Extractor ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract one transaction from a raw record. `ordinal` is the row's
    /// position in the batch, used as the id of last resort so every input
    /// row yields exactly one assessment downstream.
    pub fn extract(&self, row: &Value, ordinal: usize) -> Extraction {
        let blobs = parse_blob_columns(row);
        let mut paths = BTreeMap::new();

        let id = match probe_string(row, &blobs, ID_PATHS) {
            Some((value, path)) => {
                paths.insert("id".into(), path);
                value
            }
            None => format!("row-{ordinal}"),
        };

        let user_key = probe_string(row, &blobs, USER_KEY_PATHS).map(|(value, path)| {
            paths.insert("user_key".into(), path);
            value.trim().to_ascii_lowercase()
        });

        let amount = probe(row, &blobs, AMOUNT_PATHS).and_then(|(value, path)| {
            match parse_amount(&value) {
                Some(minor) => {
                    paths.insert("amount".into(), path);
                    Some(minor)
                }
                None => {
                    warn!("unparsable amount {value} at {path}, treated as unknown");
                    None
                }
            }
        });

        let currency = probe_string(row, &blobs, CURRENCY_PATHS).map(|(value, path)| {
            paths.insert("currency".into(), path);
            value.trim().to_ascii_uppercase()
        });

        let timestamp = probe(row, &blobs, TIMESTAMP_PATHS).and_then(|(value, path)| {
            match parse_timestamp(&value) {
                Some(ts) => {
                    paths.insert("timestamp".into(), path);
                    Some(ts)
                }
                None => {
                    warn!("unparsable timestamp {value} at {path}, treated as unknown");
                    None
                }
            }
        });

        let status = match probe_string(row, &blobs, STATUS_PATHS) {
            Some((value, path)) => {
                paths.insert("status".into(), path);
                TxnStatus::parse(&value)
            }
            None => TxnStatus::Other,
        };

        let billing_country =
            probe_string(row, &blobs, BILLING_COUNTRY_PATHS).and_then(|(value, path)| {
                normalize_iso2(&value).map(|code| {
                    paths.insert("billing_country".into(), path);
                    code
                })
            });

        let bin_country =
            probe_string(row, &blobs, BIN_COUNTRY_PATHS).and_then(|(value, path)| {
                normalize_iso2(&value).map(|code| {
                    paths.insert("bin_country".into(), path);
                    code
                })
            });

        // x-forwarded-for style values may carry a proxy chain; the first
        // entry is the client.
        let payer_ip = probe_string(row, &blobs, IP_PATHS).map(|(value, path)| {
            paths.insert("payer_ip".into(), path);
            first_in_csv_list(&value)
        });

        let mut device = BTreeMap::new();
        for (fact, candidates) in AUX_PATHS {
            if let Some((value, path)) = probe_string(row, &blobs, candidates) {
                paths.insert((*fact).into(), path);
                device.insert((*fact).to_string(), value);
            }
        }

        Extraction {
            transaction: Transaction {
                id,
                user_key,
                amount,
                currency,
                timestamp,
                billing_country,
                bin_country,
                payer_ip,
                status,
                device,
            },
            matched_paths: paths,
        }
    }
}

// ── Generic path resolution ──────────────────────────────────────────────────

/// Parse the JSON blob columns a record may carry. A blob that is already
/// an object is used as-is; a string blob is parsed softly and skipped on
/// failure.
fn parse_blob_columns(row: &Value) -> Vec<(String, Value)> {
    let mut blobs = Vec::new();
    for col in JSON_BLOB_COLUMNS {
        match lookup_key(row, col) {
            Some(Value::String(s)) => {
                if let Some(parsed) = try_parse_json(s) {
                    blobs.push(((*col).to_string(), parsed));
                }
            }
            Some(v @ Value::Object(_)) => blobs.push(((*col).to_string(), v.clone())),
            _ => {}
        }
    }
    blobs
}

fn try_parse_json(raw: &str) -> Option<Value> {
    let s = raw.trim();
    if s.is_empty() || (!s.starts_with('{') && !s.starts_with('[')) {
        return None;
    }
    serde_json::from_str(s).ok()
}

/// Probe the row, then each blob, for the first candidate path holding a
/// present value. Returns the value and the full path that matched.
fn probe(row: &Value, blobs: &[(String, Value)], candidates: &[&str]) -> Option<(Value, String)> {
    for path in candidates {
        if let Some(v) = resolve_path(row, path) {
            return Some((v.clone(), (*path).to_string()));
        }
        for (label, blob) in blobs {
            if let Some(v) = resolve_path(blob, path) {
                return Some((v.clone(), format!("{label}.{path}")));
            }
        }
    }
    None
}

fn probe_string(
    row: &Value,
    blobs: &[(String, Value)],
    candidates: &[&str],
) -> Option<(String, String)> {
    probe(row, blobs, candidates).and_then(|(value, path)| {
        value_to_string(&value).map(|s| (s, path))
    })
}

/// Walk a dot-separated path through nested objects, matching each segment
/// case-insensitively. Returns None for absent or missing-marker values.
fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = lookup_key(current, segment)?;
    }
    if is_missing(current) {
        None
    } else {
        Some(current)
    }
}

fn lookup_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    object
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Upstream exports encode missing values many ways; all of them are
/// treated as absent, the same as a missing key.
fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let t = s.trim();
            t.is_empty() || t.eq_ignore_ascii_case("nan") || t.eq_ignore_ascii_case("none")
                || t.eq_ignore_ascii_case("null")
        }
        _ => false,
    }
}

// ── Value coercions ──────────────────────────────────────────────────────────

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Minor-unit amount. Accepts integral numbers and numeric strings;
/// negative or fractional input is malformed, not coerced.
fn parse_amount(value: &Value) -> Option<u64> {
    let as_f64 = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !as_f64.is_finite() || as_f64 < 0.0 || as_f64.fract() != 0.0 {
        return None;
    }
    Some(as_f64 as u64)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// ISO-2 normalization: trim, upper-case, first two characters. Values that
/// do not start with two letters are unknown, not a guessed country.
fn normalize_iso2(raw: &str) -> Option<String> {
    let code: String = raw.trim().chars().take(2).collect();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

fn first_in_csv_list(raw: &str) -> String {
    raw.split(',')
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or(raw.trim())
        .to_string()
}
