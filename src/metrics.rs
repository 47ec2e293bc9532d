//! Sync metrics and observability.
//!
//! Counters are owned by one engine instance, so independent engines never
//! mix their numbers.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-engine translation sync counters.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Number of `translate` calls that (re)armed a debounce timer
    scheduled: AtomicUsize,

    /// Number of pending payloads overwritten by a newer call
    coalesced: AtomicUsize,

    /// Number of calls made to the external translation operation
    api_calls: AtomicUsize,

    /// Number of external calls that failed
    api_failures: AtomicUsize,

    /// Number of resolutions that cleared a field because the input was empty
    cleared: AtomicUsize,

    /// Number of finished resolutions dropped because a newer call superseded them
    stale_discards: AtomicUsize,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_failure(&self) {
        self.api_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleared(&self) {
        self.cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_discard(&self) {
        self.stale_discards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scheduled(&self) -> usize {
        self.scheduled.load(Ordering::Relaxed)
    }

    pub fn coalesced(&self) -> usize {
        self.coalesced.load(Ordering::Relaxed)
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub fn api_failures(&self) -> usize {
        self.api_failures.load(Ordering::Relaxed)
    }

    pub fn cleared(&self) -> usize {
        self.cleared.load(Ordering::Relaxed)
    }

    pub fn stale_discards(&self) -> usize {
        self.stale_discards.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let scheduled = self.scheduled();
        let coalesced = self.coalesced();
        let coalesce_rate = if scheduled > 0 {
            (coalesced as f64 / scheduled as f64) * 100.0
        } else {
            0.0
        };

        let calls = self.api_calls();
        let failures = self.api_failures();
        let api_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            scheduled,
            coalesced,
            coalesce_rate,
            api_calls: calls,
            api_failures: failures,
            api_success_rate,
            cleared: self.cleared(),
            stale_discards: self.stale_discards(),
        }
    }
}

/// Metrics report containing current sync statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// Number of scheduled translate calls
    pub scheduled: usize,

    /// Number of payloads superseded inside a debounce window
    pub coalesced: usize,

    /// Share of scheduled calls that were superseded, as a percentage (0-100)
    pub coalesce_rate: f64,

    /// Number of external translation calls
    pub api_calls: usize,

    /// Number of failed external translation calls
    pub api_failures: usize,

    /// External call success rate as a percentage (0-100)
    pub api_success_rate: f64,

    /// Number of empty-input clears
    pub cleared: usize,

    /// Number of superseded results that were dropped
    pub stale_discards: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Counter Tests ====================

    #[test]
    fn test_new_metrics_are_zero() {
        let metrics = SyncMetrics::new();
        assert_eq!(metrics.scheduled(), 0);
        assert_eq!(metrics.coalesced(), 0);
        assert_eq!(metrics.api_calls(), 0);
        assert_eq!(metrics.api_failures(), 0);
        assert_eq!(metrics.cleared(), 0);
        assert_eq!(metrics.stale_discards(), 0);
    }

    #[test]
    fn test_record_counters() {
        let metrics = SyncMetrics::new();
        metrics.record_scheduled();
        metrics.record_scheduled();
        metrics.record_coalesced();
        metrics.record_api_call();
        metrics.record_api_failure();
        metrics.record_cleared();
        metrics.record_stale_discard();

        assert_eq!(metrics.scheduled(), 2);
        assert_eq!(metrics.coalesced(), 1);
        assert_eq!(metrics.api_calls(), 1);
        assert_eq!(metrics.api_failures(), 1);
        assert_eq!(metrics.cleared(), 1);
        assert_eq!(metrics.stale_discards(), 1);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = SyncMetrics::new();
        let b = SyncMetrics::new();
        a.record_api_call();

        assert_eq!(a.api_calls(), 1);
        assert_eq!(b.api_calls(), 0);
    }

    // ==================== Report Tests ====================

    #[test]
    fn test_report_empty() {
        let report = SyncMetrics::new().report();

        assert_eq!(report.scheduled, 0);
        assert_eq!(report.coalesce_rate, 0.0);
        assert_eq!(report.api_calls, 0);
        assert_eq!(report.api_success_rate, 0.0);
    }

    #[test]
    fn test_report_coalesce_rate() {
        let metrics = SyncMetrics::new();

        // 4 calls, 3 superseded = 75%
        for _ in 0..4 {
            metrics.record_scheduled();
        }
        for _ in 0..3 {
            metrics.record_coalesced();
        }

        let report = metrics.report();
        assert_eq!(report.coalesce_rate, 75.0);
    }

    #[test]
    fn test_report_api_success_rate() {
        let metrics = SyncMetrics::new();

        // 4 calls, 1 failure = 75% success rate
        for _ in 0..4 {
            metrics.record_api_call();
        }
        metrics.record_api_failure();

        let report = metrics.report();
        assert_eq!(report.api_calls, 4);
        assert_eq!(report.api_failures, 1);
        assert_eq!(report.api_success_rate, 75.0);
    }

    #[test]
    fn test_report_serializes() {
        let metrics = SyncMetrics::new();
        metrics.record_cleared();

        let json = serde_json::to_string(&metrics.report()).expect("Should serialize");
        assert!(json.contains("\"cleared\":1"));
        assert!(json.contains("api_success_rate"));
    }
}
