//! Process-wide accounting for quote queries.
//!
//! `Accounting` is built once at startup and handed to every collector through an `Arc`.
//! The prometheus primitives it wraps are atomic, so concurrent requests increment them
//! without extra locking. Nothing resets them.
use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

/// Name of the counter of completed `/price` requests.
pub const QUERIES_TOTAL: &str = "quotes_exporter_queries_total";
/// Name of the counter of failed symbol lookups.
pub const FAILED_QUERIES_TOTAL: &str = "quotes_exporter_failed_queries_total";
/// Name of the lookup latency distribution.
pub const QUERY_DURATION_SECONDS: &str = "quotes_exporter_query_duration_seconds";

/// Query counter, failure counter and lookup latency distribution.
#[derive(Clone)]
pub struct Accounting {
    queries: IntCounter,
    failures: IntCounter,
    duration: Histogram,
}

impl Accounting {
    /// Create fresh, unregistered registers.
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            queries: IntCounter::new(QUERIES_TOTAL, "Count of completed queries")?,
            failures: IntCounter::new(FAILED_QUERIES_TOTAL, "Count of failed queries")?,
            duration: Histogram::with_opts(HistogramOpts::new(
                QUERY_DURATION_SECONDS,
                "Duration of queries to the upstream API",
            ))?,
        })
    }

    /// Count one inbound request.
    pub fn record_query(&self) {
        self.queries.inc();
    }

    /// Count one failed symbol lookup.
    pub fn record_failure(&self) {
        self.failures.inc();
    }

    /// Add one lookup latency observation.
    pub fn observe_duration(&self, elapsed: Duration) {
        self.duration.observe(elapsed.as_secs_f64());
    }

    /// Requests counted so far.
    pub fn queries(&self) -> u64 {
        self.queries.get()
    }

    /// Failed lookups counted so far.
    pub fn failures(&self) -> u64 {
        self.failures.get()
    }

    /// Number of latency observations.
    pub fn duration_count(&self) -> u64 {
        self.duration.get_sample_count()
    }

    /// Sum of observed latencies in seconds.
    pub fn duration_sum(&self) -> f64 {
        self.duration.get_sample_sum()
    }

    /// Expose the three series through `registry`. The same registers may be added to any
    /// number of registries.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.queries.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.duration.clone()))?;
        Ok(())
    }
}
