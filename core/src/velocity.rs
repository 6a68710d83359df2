//! Per-user transaction velocity tracking.
//!
//! One growable window per user key, bounded by a time horizon and an
//! optional count horizon. Entries older than the horizon are dropped
//! lazily on each observation, so the per-call cost stays amortized O(1)
//! for a bounded horizon.
//!
//! PRECONDITION: observations for one user must arrive in non-decreasing
//! timestamp order. Velocity metrics are only meaningful under temporal
//! ordering, so a violation is reported as a usage error instead of being
//! silently mis-scored.

use crate::config::VelocityConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::UserKey;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// What the tracker knew at the moment one transaction was observed.
/// Captured into the assessment, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocitySnapshot {
    /// Prior transactions for this user inside the window. Excludes the
    /// transaction being observed.
    pub count_in_window: usize,
    /// Gap to the immediately preceding transaction for this user, absent
    /// when there is none.
    pub since_previous_secs: Option<i64>,
    /// The window horizon the count was taken over.
    pub window_secs: i64,
}

impl VelocitySnapshot {
    /// Snapshot for a transaction that cannot participate in velocity
    /// tracking (unknown user or unknown timestamp).
    pub fn empty(window_secs: i64) -> Self {
        Self {
            count_in_window: 0,
            since_previous_secs: None,
            window_secs,
        }
    }
}

#[derive(Debug, Default)]
struct UserWindow {
    entries: VecDeque<(DateTime<Utc>, Option<u64>)>,
}

pub struct VelocityTracker {
    window: Duration,
    window_secs: i64,
    max_entries: Option<usize>,
    windows: HashMap<UserKey, UserWindow>,
}

impl VelocityTracker {
    pub fn new(config: &VelocityConfig) -> Self {
        Self {
            window: Duration::seconds(config.window_secs),
            window_secs: config.window_secs,
            max_entries: config.max_entries,
            windows: HashMap::new(),
        }
    }

    /// Record one transaction and return the pre-append view of the user's
    /// window: prior count inside the horizon and the gap since the
    /// previous transaction.
    pub fn observe(
        &mut self,
        user_key: &str,
        timestamp: DateTime<Utc>,
        amount: Option<u64>,
    ) -> EngineResult<VelocitySnapshot> {
        let window = self.windows.entry(user_key.to_string()).or_default();

        if let Some(&(previous, _)) = window.entries.back() {
            if timestamp < previous {
                return Err(EngineError::OutOfOrderObservation {
                    user_key: user_key.to_string(),
                    prev: previous,
                    next: timestamp,
                });
            }
        }

        // Lazy eviction: drop entries that have aged out of the horizon.
        let horizon_start = timestamp - self.window;
        while let Some(&(oldest, _)) = window.entries.front() {
            if oldest <= horizon_start {
                window.entries.pop_front();
            } else {
                break;
            }
        }

        let snapshot = VelocitySnapshot {
            count_in_window: window.entries.len(),
            since_previous_secs: window
                .entries
                .back()
                .map(|&(previous, _)| (timestamp - previous).num_seconds()),
            window_secs: self.window_secs,
        };

        window.entries.push_back((timestamp, amount));
        if let Some(cap) = self.max_entries {
            while window.entries.len() > cap {
                window.entries.pop_front();
            }
        }

        Ok(snapshot)
    }

    /// Evict users whose newest entry has aged past the horizon. Callers
    /// processing an unbounded stream invoke this periodically; a bounded
    /// batch never needs to.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let horizon_start = now - self.window;
        self.windows
            .retain(|_, w| matches!(w.entries.back(), Some(&(newest, _)) if newest > horizon_start));
    }

    /// Number of users currently holding a window.
    pub fn tracked_users(&self) -> usize {
        self.windows.len()
    }
}
