//! Immutable exporter configuration.
//!
//! Built once in `main` from the command line and passed by reference (or `Arc`) to the
//! resolver, the collector and the router. Request handling never reads flags or globals.
use std::fmt;
use std::io::Read;
use std::time::Duration;

use quote_common::SymbolFormat;

use crate::args::Args;
use crate::error::ExporterError;
use crate::model::cache::InvalidWindows;
use crate::source::Provider;

/// Validated settings for one exporter process.
#[derive(Clone)]
pub struct ExporterConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Upstream quote provider.
    pub provider: Provider,
    /// Accepted `symbols` query format.
    pub symbol_format: SymbolFormat,
    /// Whether volume samples are exported next to prices.
    pub report_volume: bool,
    /// Freshness window of cached quotes.
    pub cache_fresh: Duration,
    /// Retention window of cached quotes (never shorter than `cache_fresh`).
    pub cache_retention: Duration,
    /// Period of the cache sweeper.
    pub cache_sweep_interval: Duration,
    /// Timeout of a single upstream request.
    pub upstream_timeout: Duration,
    /// World Trading Data token, when that provider is used.
    pub wtd_token: Option<String>,
}

impl ExporterConfig {
    /// Validate `args`, reading the WTD token from `stdin` when requested.
    pub fn from_args<R: Read>(args: Args, mut stdin: R) -> Result<Self, ExporterError> {
        let wtd_token = if args.read_wtd_token_from_stdin {
            let mut raw = String::new();
            stdin.read_to_string(&mut raw)?;
            Some(raw.trim_end_matches(['\r', '\n']).to_string())
        } else {
            args.wtd_token
        }
        .filter(|token| !token.is_empty());

        if args.cache_retention < args.cache_fresh {
            return Err(InvalidWindows {
                fresh_for: args.cache_fresh,
                retain_for: args.cache_retention,
            }
            .into());
        }
        if args.cache_sweep_interval.is_zero() {
            return Err(ExporterError::Config(
                "--cache-sweep-interval must be positive".to_string(),
            ));
        }
        if args.upstream_timeout.is_zero() {
            return Err(ExporterError::Config(
                "--upstream-timeout must be positive".to_string(),
            ));
        }
        if args.provider == Provider::Wtd && wtd_token.is_none() {
            return Err(ExporterError::Config(
                "--provider wtd needs --wtd-token or --read-wtd-token-from-stdin".to_string(),
            ));
        }

        Ok(Self {
            port: args.port,
            provider: args.provider,
            symbol_format: args.symbols_format,
            report_volume: args.volume,
            cache_fresh: args.cache_fresh,
            cache_retention: args.cache_retention,
            cache_sweep_interval: args.cache_sweep_interval,
            upstream_timeout: args.upstream_timeout,
            wtd_token,
        })
    }
}

impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("port", &self.port)
            .field("provider", &self.provider)
            .field("symbol_format", &self.symbol_format)
            .field("report_volume", &self.report_volume)
            .field("cache_fresh", &self.cache_fresh)
            .field("cache_retention", &self.cache_retention)
            .field("cache_sweep_interval", &self.cache_sweep_interval)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("wtd_token", &self.wtd_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
