//! Per-request quote collection.
//!
//! A `QuoteCollector` is created for one `/price` request. It performs one cached lookup
//! per symbol, keeps the shared accounting up to date and hands a price sample (and,
//! when enabled, a volume sample) for every resolved symbol to the caller's sink.
//!
//! A failing symbol is counted, logged and skipped; the other symbols of the request are
//! still collected.
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use quote_common::{AssetType, QuoteRequest, Symbol};

use crate::model::accounting::Accounting;
use crate::model::cache::{QuoteCache, QuoteKey};
use crate::model::sample::{Sample, SampleSink};
use crate::source::QuoteSource;

/// Outcome counts of one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Symbols that produced a price sample.
    pub succeeded: usize,
    /// Symbols whose lookup failed.
    pub failed: usize,
}

/// Collects quotes for a single request.
pub struct QuoteCollector {
    source: Arc<dyn QuoteSource>,
    cache: Arc<QuoteCache>,
    accounting: Arc<Accounting>,
    report_volume: bool,
}

impl QuoteCollector {
    /// Create a collector over the shared source, cache and accounting.
    pub fn new(
        source: Arc<dyn QuoteSource>,
        cache: Arc<QuoteCache>,
        accounting: Arc<Accounting>,
        report_volume: bool,
    ) -> Self {
        Self {
            source,
            cache,
            accounting,
            report_volume,
        }
    }

    /// Look up every symbol of `request` and emit samples for the ones that resolve.
    pub fn collect(&self, request: &QuoteRequest, sink: &mut dyn SampleSink) -> CollectReport {
        self.accounting.record_query();
        info!("Looking for {}", request);

        let mut report = CollectReport::default();
        for (asset_type, symbol) in request.iter() {
            if self.collect_symbol(asset_type, symbol, sink) {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    fn collect_symbol(
        &self,
        asset_type: AssetType,
        symbol: &Symbol,
        sink: &mut dyn SampleSink,
    ) -> bool {
        let key = QuoteKey::new(asset_type, symbol);
        let start = Instant::now();
        let lookup = self.cache.lookup(&key, || {
            self.source
                .fetch(asset_type, symbol)
                .and_then(|quote| quote.validated())
        });
        self.accounting.observe_duration(start.elapsed());

        let quote = match lookup.outcome {
            Ok(quote) => quote,
            Err(err) => {
                self.accounting.record_failure();
                warn!("Error looking up {} ({}): {}", symbol, asset_type, err);
                return false;
            }
        };

        info!(
            "Retrieved {} ({}), price: {}, volume: {:?}{}",
            quote.symbol,
            quote.name,
            quote.price,
            quote.volume,
            if lookup.from_cache { " (cached)" } else { "" }
        );

        sink.emit(Sample::price(&quote));
        if self.report_volume {
            sink.emit(Sample::volume(&quote));
        }
        true
    }
}
