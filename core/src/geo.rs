//! IP geolocation boundary: the resolver trait the core consumes, the
//! facts it produces, and the per-batch memoization cache.
//!
//! RULES:
//!   - A failed or timed-out lookup degrades to `GeoFacts::unknown()`,
//!     logged as a warning. It never aborts the batch.
//!   - Each distinct IP is resolved at most once per batch. Memoization is
//!     the core's responsibility, not the resolver's.
//!   - An unresolvable IP yields fully-unknown facts, never a placeholder
//!     country.

use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

/// Location and network facts for one payer IP. All best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoFacts {
    /// ISO-2 country code, upper-cased.
    pub country: Option<String>,
    pub continent: Option<String>,
    pub asn: Option<String>,
    pub org: Option<String>,
    pub is_proxy: bool,
}

impl GeoFacts {
    /// The fully-unknown value every failure path degrades to.
    pub fn unknown() -> Self {
        Self {
            country: None,
            continent: None,
            asn: None,
            org: None,
            is_proxy: false,
        }
    }

    /// Distinguishes the unresolved condition from a real resolution.
    pub fn is_unknown(&self) -> bool {
        self.country.is_none() && self.continent.is_none() && self.asn.is_none()
            && self.org.is_none()
            && !self.is_proxy
    }
}

impl Default for GeoFacts {
    fn default() -> Self {
        Self::unknown()
    }
}

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("invalid IP syntax: {0:?}")]
    InvalidIp(String),

    #[error("no record for IP {0}")]
    NotFound(String),

    #[error("lookup timed out for IP {0}")]
    Timeout(String),

    #[error("resolver backend failure: {0}")]
    Backend(String),
}

/// The external collaborator interface. Implementations must be idempotent
/// and side-effect-free from the caller's perspective; per-lookup timeouts
/// are the implementation's concern and surface as `GeoError::Timeout`.
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, ip: &str) -> Result<GeoFacts, GeoError>;
}

// ── Static resolver ──────────────────────────────────────────────────────────

/// In-memory resolver backed by a fixed IP table. Used by the runner and
/// tests; the offline geolocation database itself lives outside the core.
#[derive(Debug, Default)]
pub struct StaticGeoResolver {
    entries: HashMap<IpAddr, GeoFacts>,
}

impl StaticGeoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, ip: &str, facts: GeoFacts) -> Self {
        if let Ok(addr) = ip.parse::<IpAddr>() {
            self.entries.insert(addr, facts);
        }
        self
    }

    pub fn insert(&mut self, ip: &str, facts: GeoFacts) {
        if let Ok(addr) = ip.parse::<IpAddr>() {
            self.entries.insert(addr, facts);
        }
    }
}

impl GeoResolver for StaticGeoResolver {
    fn resolve(&self, ip: &str) -> Result<GeoFacts, GeoError> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| GeoError::InvalidIp(ip.to_string()))?;
        self.entries
            .get(&addr)
            .cloned()
            .ok_or_else(|| GeoError::NotFound(ip.to_string()))
    }
}

// ── Memoization cache ────────────────────────────────────────────────────────

/// Compute-once-per-key memoization of IP → GeoFacts.
///
/// The lock is held across the resolve call, which serializes lookups for
/// the same batch and guarantees the backend sees each distinct IP exactly
/// once even under parallel callers.
pub struct GeoCache {
    resolver: Arc<dyn GeoResolver>,
    entries: Mutex<HashMap<String, GeoFacts>>,
}

impl GeoCache {
    pub fn new(resolver: Arc<dyn GeoResolver>) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `ip`, memoized. Any resolver error degrades to the
    /// fully-unknown facts and the batch continues.
    pub fn lookup(&self, ip: &str) -> GeoFacts {
        let key = ip.trim().to_string();
        let mut entries = self.entries.lock();
        if let Some(facts) = entries.get(&key) {
            return facts.clone();
        }
        let facts = match self.resolver.resolve(&key) {
            Ok(facts) => facts,
            Err(err) => {
                warn!("geo lookup degraded to unknown for {key}: {err}");
                GeoFacts::unknown()
            }
        };
        entries.insert(key, facts.clone());
        facts
    }

    /// Number of distinct IPs resolved so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
