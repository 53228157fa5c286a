//! Daily usage counter for the structured search API.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use serde::Serialize;
use tracing::{info, warn};

/// Quota statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaStats {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    /// Share of the ceiling already used, 0–100.
    pub percentage: f64,
}

/// Count of structured calls made "today" against a fixed ceiling.
///
/// Shared between the structured client (which records calls) and the
/// fetcher/orchestrator (which report on it). The remote API can also
/// declare the quota spent before the local ceiling is reached; see
/// [`QuotaCounter::mark_exhausted`]. Nothing resets either state except
/// an explicit call to [`QuotaCounter::reset`].
#[derive(Debug)]
pub struct QuotaCounter {
    used: AtomicU32,
    limit: u32,
    exhausted: AtomicBool,
}

impl QuotaCounter {
    /// Creates a counter with the given daily ceiling.
    pub fn new(limit: u32) -> Self {
        Self {
            used: AtomicU32::new(0),
            limit,
            exhausted: AtomicBool::new(false),
        }
    }

    /// Calls recorded since the last reset.
    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns whether another call fits under the ceiling.
    pub fn has_remaining(&self) -> bool {
        !self.is_exhausted() && self.used() < self.limit
    }

    /// Whether the remote API reported the quota spent.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    /// Blocks further calls until the next reset.
    pub fn mark_exhausted(&self) {
        if !self.exhausted.swap(true, Ordering::SeqCst) {
            warn!(
                "Structured API reported its quota spent after {} calls; disabled until reset",
                self.used()
            );
        }
    }

    /// Records one successful call and returns the new count.
    pub fn record_call(&self) -> u32 {
        self.used.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Zeroes the counter.
    pub fn reset(&self) {
        let previous = self.used.swap(0, Ordering::SeqCst);
        self.exhausted.store(false, Ordering::SeqCst);
        info!("Structured API quota reset ({} calls recorded)", previous);
    }

    pub fn stats(&self) -> QuotaStats {
        let used = self.used();
        let percentage = if self.limit == 0 {
            100.0
        } else {
            (f64::from(used) / f64::from(self.limit) * 100.0).min(100.0)
        };
        QuotaStats {
            used,
            limit: self.limit,
            remaining: if self.is_exhausted() {
                0
            } else {
                self.limit.saturating_sub(used)
            },
            percentage,
        }
    }
}
