//! Per-worker throughput metrics.
//!
//! Rates are instantaneous, sampled at commit boundaries: each update
//! divides the counter deltas by the elapsed wall time since the previous
//! update. Bursty commit timing is accepted as signal, not filtered.
//!
//! Snapshots are published whole through a `watch` channel, so the
//! aggregator sees either the old or the new value, never a torn one.

use std::time::Instant;
use tokio::sync::watch;

/// Latest rates for one worker. Written only by that worker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateSnapshot {
    /// Cumulative documents loaded; monotonically non-decreasing.
    pub total_documents: u64,
    pub docs_per_ms: f64,
    pub bytes_per_ms: f64,
    pub value_per_ms: f64,
}

/// Rolling-rate calculator owned by a single worker.
pub struct WorkerMetrics {
    last_documents: u64,
    last_bytes: u64,
    last_value: f64,
    last_update: Instant,
    current: RateSnapshot,
    tx: watch::Sender<RateSnapshot>,
}

impl WorkerMetrics {
    pub fn new(tx: watch::Sender<RateSnapshot>) -> Self {
        Self {
            last_documents: 0,
            last_bytes: 0,
            last_value: 0.0,
            last_update: Instant::now(),
            current: RateSnapshot::default(),
            tx,
        }
    }

    /// Create a metrics instance together with the receiving half of its
    /// snapshot channel.
    pub fn channel() -> (Self, watch::Receiver<RateSnapshot>) {
        let (tx, rx) = watch::channel(RateSnapshot::default());
        (Self::new(tx), rx)
    }

    /// Record new cumulative totals at a commit boundary.
    pub fn update(&mut self, documents: u64, bytes: u64, value: f64) {
        self.update_at(Instant::now(), documents, bytes, value);
    }

    fn update_at(&mut self, now: Instant, documents: u64, bytes: u64, value: f64) {
        let elapsed_ms = now.duration_since(self.last_update).as_secs_f64() * 1000.0;
        self.last_update = now;

        // Zero elapsed time keeps the previous rates rather than dividing.
        if elapsed_ms > 0.0 {
            self.current.docs_per_ms = (documents - self.last_documents) as f64 / elapsed_ms;
            self.current.bytes_per_ms = (bytes - self.last_bytes) as f64 / elapsed_ms;
            self.current.value_per_ms = (value - self.last_value) / elapsed_ms;
        }
        self.current.total_documents = documents;

        self.last_documents = documents;
        self.last_bytes = bytes;
        self.last_value = value;

        // Receivers may be gone during shutdown.
        let _ = self.tx.send(self.current);
    }

    pub fn snapshot(&self) -> RateSnapshot {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn rates_reflect_counter_deltas() {
        let (mut metrics, rx) = WorkerMetrics::channel();
        let start = Instant::now();
        metrics.last_update = start;

        metrics.update_at(start + Duration::from_millis(100), 1000, 500_000, 250.0);
        let s = *rx.borrow();
        assert_eq!(s.total_documents, 1000);
        assert!((s.docs_per_ms - 10.0).abs() < 1e-6);
        assert!((s.bytes_per_ms - 5000.0).abs() < 1e-6);
        assert!((s.value_per_ms - 2.5).abs() < 1e-6);

        metrics.update_at(start + Duration::from_millis(300), 1400, 700_000, 350.0);
        let s = *rx.borrow();
        assert_eq!(s.total_documents, 1400);
        assert!((s.docs_per_ms - 2.0).abs() < 1e-6);
        assert!((s.bytes_per_ms - 1000.0).abs() < 1e-6);
        assert!((s.value_per_ms - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_elapsed_keeps_previous_rates() {
        let (mut metrics, _rx) = WorkerMetrics::channel();
        let start = Instant::now();

        metrics.update_at(start + Duration::from_millis(10), 100, 1000, 10.0);
        let before = metrics.snapshot();

        // Same instant again: totals advance, rates must stay finite and
        // unchanged.
        metrics.update_at(start + Duration::from_millis(10), 200, 2000, 20.0);
        let after = metrics.snapshot();

        assert_eq!(after.total_documents, 200);
        assert_eq!(after.docs_per_ms, before.docs_per_ms);
        assert_eq!(after.bytes_per_ms, before.bytes_per_ms);
        assert_eq!(after.value_per_ms, before.value_per_ms);
        assert!(after.docs_per_ms.is_finite());
    }

    #[test]
    fn first_update_rates_are_finite_and_non_negative() {
        let (mut metrics, rx) = WorkerMetrics::channel();
        metrics.update(500, 1000, 5.0);
        let s = *rx.borrow();
        assert!(s.docs_per_ms.is_finite() && s.docs_per_ms >= 0.0);
        assert!(s.bytes_per_ms.is_finite() && s.bytes_per_ms >= 0.0);
        assert!(s.value_per_ms.is_finite() && s.value_per_ms >= 0.0);
    }

    #[test]
    fn watch_publishes_whole_snapshots() {
        let (mut metrics, rx) = WorkerMetrics::channel();
        let start = Instant::now();
        metrics.update_at(start + Duration::from_millis(50), 10, 100, 1.0);
        metrics.update_at(start + Duration::from_millis(100), 20, 200, 2.0);

        // The receiver observes the latest fully-written snapshot.
        let s = *rx.borrow();
        assert_eq!(s.total_documents, 20);
    }
}
