//! Prometheus text exposition of collected samples.
//!
//! Each `/price` request renders its own `MetricsPage`: a fresh registry holding the
//! price (and optional volume) gauges for that request plus the shared accounting series.
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::model::accounting::Accounting;
use crate::model::sample::{Sample, SampleKind, SampleSink};

/// Gauge of last-traded prices.
pub const PRICE_METRIC: &str = "quotes_exporter_price";
/// Gauge of traded volumes.
pub const VOLUME_METRIC: &str = "quotes_exporter_volume";

const LABELS: [&str; 2] = ["symbol", "name"];

/// Registry for one request, filled through `SampleSink`.
pub struct MetricsPage {
    registry: Registry,
    price: GaugeVec,
    volume: Option<GaugeVec>,
}

impl MetricsPage {
    /// New page exposing `accounting`; the volume gauge exists only if `report_volume`.
    pub fn new(accounting: &Accounting, report_volume: bool) -> prometheus::Result<Self> {
        let registry = Registry::new();
        accounting.register(&registry)?;

        let price = GaugeVec::new(Opts::new(PRICE_METRIC, "Asset Price."), &LABELS)?;
        registry.register(Box::new(price.clone()))?;

        let volume = if report_volume {
            let volume = GaugeVec::new(Opts::new(VOLUME_METRIC, "Asset Volume."), &LABELS)?;
            registry.register(Box::new(volume.clone()))?;
            Some(volume)
        } else {
            None
        };

        Ok(Self {
            registry,
            price,
            volume,
        })
    }

    /// Text exposition of everything on the page.
    pub fn render(&self) -> prometheus::Result<String> {
        render(&self.registry)
    }
}

impl SampleSink for MetricsPage {
    fn emit(&mut self, sample: Sample) {
        let gauge = match sample.kind {
            SampleKind::Price => Some(&self.price),
            SampleKind::Volume => self.volume.as_ref(),
        };
        if let Some(gauge) = gauge {
            gauge
                .with_label_values(&[sample.symbol.as_str(), sample.name.as_str()])
                .set(sample.value);
        }
    }
}

/// Encode every metric family of `registry` in the text format.
pub fn render(registry: &Registry) -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
