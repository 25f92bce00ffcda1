//! Metric samples emitted by the collector and the sinks that receive them.
use quote_common::Quote;

/// Which gauge a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Last-traded price.
    Price,
    /// Traded volume.
    Volume,
}

/// One gauge observation labelled by symbol and display name.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Gauge the value is recorded on.
    pub kind: SampleKind,
    /// Symbol as reported by the upstream.
    pub symbol: String,
    /// Display name of the instrument.
    pub name: String,
    /// Observed value.
    pub value: f64,
}

impl Sample {
    /// Price sample for `quote`, labels taken verbatim.
    pub fn price(quote: &Quote) -> Self {
        Self {
            kind: SampleKind::Price,
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            value: quote.price,
        }
    }

    /// Volume sample for `quote`; zero when the upstream reported no volume.
    pub fn volume(quote: &Quote) -> Self {
        Self {
            kind: SampleKind::Volume,
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            value: quote.volume.unwrap_or(0) as f64,
        }
    }
}

/// Receiver of samples produced while collecting one request.
pub trait SampleSink {
    /// Accept one sample.
    fn emit(&mut self, sample: Sample);
}

impl SampleSink for Vec<Sample> {
    fn emit(&mut self, sample: Sample) {
        self.push(sample);
    }
}
