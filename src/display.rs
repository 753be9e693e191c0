//! System-wide metrics aggregation and status-line rendering.
//!
//! Once per reporting tick the orchestrator folds every worker's latest
//! snapshot into the aggregator, which tracks running min/avg/max per rate
//! dimension since the last reset and renders one overwritten status line.

use crate::metrics::RateSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

const MB: f64 = 1024.0 * 1024.0;

/// One aggregated observation, suitable for display and for the metrics
/// sink.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedSnapshot {
    pub timestamp: DateTime<Utc>,
    pub collection: String,
    pub total_documents: u64,
    pub value_per_second: f64,
    pub documents_per_second: f64,
    pub megabytes_per_second: f64,
}

/// Running min/avg/max for one rate dimension.
#[derive(Debug, Clone, Copy)]
struct RunningStats {
    min: f64,
    max: f64,
    sum: f64,
}

impl RunningStats {
    fn new() -> Self {
        Self {
            min: f64::MAX,
            max: 0.0,
            sum: 0.0,
        }
    }

    fn observe(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
    }

    fn avg(&self, ticks: u64) -> f64 {
        if ticks == 0 {
            0.0
        } else {
            self.sum / ticks as f64
        }
    }
}

/// Merges worker snapshots per tick and keeps resettable running statistics.
pub struct MetricsAggregator {
    collection: String,
    initial_documents: u64,
    reset_after_ticks: Option<u64>,
    ticks: u64,

    total_documents: u64,
    docs_per_ms: f64,
    bytes_per_ms: f64,
    value_per_ms: f64,

    docs: RunningStats,
    bytes: RunningStats,
    value: RunningStats,
}

impl MetricsAggregator {
    /// `initial_documents` is the count observed in the collection at
    /// startup; `reset_after_ticks` of `None` keeps a continuous average.
    pub fn new(
        collection: impl Into<String>,
        initial_documents: u64,
        reset_after_ticks: Option<u64>,
    ) -> Self {
        Self {
            collection: collection.into(),
            initial_documents,
            reset_after_ticks,
            ticks: 0,
            total_documents: initial_documents,
            docs_per_ms: 0.0,
            bytes_per_ms: 0.0,
            value_per_ms: 0.0,
            docs: RunningStats::new(),
            bytes: RunningStats::new(),
            value: RunningStats::new(),
        }
    }

    /// Start a new tick: clear the per-tick sums and, when the reset window
    /// has elapsed, the running statistics.
    pub fn begin_tick(&mut self) {
        if let Some(window) = self.reset_after_ticks {
            if self.ticks >= window {
                self.ticks = 0;
                self.docs = RunningStats::new();
                self.bytes = RunningStats::new();
                self.value = RunningStats::new();
            }
        }
        self.total_documents = self.initial_documents;
        self.docs_per_ms = 0.0;
        self.bytes_per_ms = 0.0;
        self.value_per_ms = 0.0;
    }

    /// Fold one worker's latest snapshot into the current tick.
    pub fn add(&mut self, snapshot: &RateSnapshot) {
        self.total_documents += snapshot.total_documents;
        self.docs_per_ms += snapshot.docs_per_ms;
        self.bytes_per_ms += snapshot.bytes_per_ms;
        self.value_per_ms += snapshot.value_per_ms;
    }

    /// Close the tick: update running statistics and produce the aggregated
    /// observation.
    pub fn finish_tick(&mut self) -> AggregatedSnapshot {
        self.ticks += 1;
        self.docs.observe(self.docs_per_ms);
        self.bytes.observe(self.bytes_per_ms);
        self.value.observe(self.value_per_ms);

        AggregatedSnapshot {
            timestamp: Utc::now(),
            collection: self.collection.clone(),
            total_documents: self.total_documents,
            value_per_second: 1000.0 * self.value_per_ms,
            documents_per_second: 1000.0 * self.docs_per_ms,
            megabytes_per_second: 1000.0 * self.bytes_per_ms / MB,
        }
    }

    pub fn total_documents(&self) -> u64 {
        self.total_documents
    }

    /// The live status line, overwritten in place with `\r`.
    pub fn status_line(&self) -> String {
        if self.docs_per_ms < 0.05 {
            return format!("Loaded {} POs...", group_thousands(self.total_documents));
        }
        format!(
            "Loaded {} POs for $ {} /s at {} PO/s ({:.2} MB/s)",
            group_thousands(self.total_documents),
            group_money(1000.0 * self.value_per_ms),
            group_thousands((1000.0 * self.docs_per_ms).ceil() as u64),
            1000.0 * self.bytes_per_ms / MB,
        )
    }

    /// Min/avg/max detail across the current reset window.
    pub fn detail_line(&self) -> String {
        let min = |s: &RunningStats| if s.min == f64::MAX { 0.0 } else { s.min };
        format!(
            "$ {:.2}/{:.2}/{:.2} /s at {}/{}/{} PO/s ({:.2}/{:.2}/{:.2} MB/s)",
            1000.0 * min(&self.value),
            1000.0 * self.value.avg(self.ticks),
            1000.0 * self.value.max,
            (1000.0 * min(&self.docs)).ceil() as u64,
            (1000.0 * self.docs.avg(self.ticks)) as u64,
            (1000.0 * self.docs.max).ceil() as u64,
            1000.0 * min(&self.bytes) / MB,
            1000.0 * self.bytes.avg(self.ticks) / MB,
            1000.0 * self.bytes.max / MB,
        )
    }
}

/// `1234567` -> `"1,234,567"`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `1234567.891` -> `"1,234,567.89"`.
fn group_money(value: f64) -> String {
    let cents = (value.max(0.0) * 100.0).round() as u64;
    format!("{}.{:02}", group_thousands(cents / 100), cents % 100)
}
