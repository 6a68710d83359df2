//! The immutable per-transaction record the pipeline scores.
//!
//! Every optional field that could not be extracted is `None` — explicitly
//! unknown, never a guessed default. Unknown fields disable the risk
//! factors that would need them; they never fabricate a signal.

use crate::types::{TransactionId, UserKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnStatus {
    Success,
    Failed,
    Other,
}

impl TxnStatus {
    /// Lenient parse over the status vocabularies seen in upstream exports.
    /// Anything unrecognized is `Other`, not an error.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "approved" | "completed" | "captured" => Self::Success,
            "failed" | "failure" | "declined" | "error" => Self::Failed,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Normalized email, when one was found anywhere in the record.
    pub user_key: Option<UserKey>,
    /// Integer minor-unit currency amount. Negative or malformed input
    /// parses to `None`.
    pub amount: Option<u64>,
    pub currency: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// ISO-2 code, upper-cased.
    pub billing_country: Option<String>,
    /// ISO-2 issuer country from the card BIN.
    pub bin_country: Option<String>,
    pub payer_ip: Option<String>,
    pub status: TxnStatus,
    /// Auxiliary browser/device/card facts pulled from the payload
    /// (browser, os, language, timezone, screen resolution, card brand, ...).
    /// BTreeMap keeps serialized output stable across runs.
    pub device: BTreeMap<String, String>,
}
