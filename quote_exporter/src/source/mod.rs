//! Upstream quote providers.
//!
//! A `QuoteSource` resolves one symbol per call, which is also the granularity of the
//! cache. Implementations are blocking: the collector runs on a blocking worker and every
//! call is bounded by the HTTP client's timeout.
//!
//! - `yahoo`: Yahoo Finance chart endpoint (JSON), any asset type.
//! - `stonks`: stonks.scd31.com plain-text endpoint, price only.
//! - `wtd`: World Trading Data API (JSON, token), separate stock and mutual fund paths.
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use quote_common::{AssetType, Quote, QuoteError, Result, Symbol};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use strum_macros::Display;
use url::Url;

use crate::config::ExporterConfig;
use crate::error::ExporterError;

pub mod stonks;
pub mod wtd;
pub mod yahoo;

const USER_AGENT: &str = concat!("quote_exporter/", env!("CARGO_PKG_VERSION"));

/// Capability to fetch the current quote of a symbol.
pub trait QuoteSource: Send + Sync {
    /// Short provider name used in logs.
    fn id(&self) -> &'static str;

    /// Fetch the current quote of `symbol`, treated as an instrument of `asset_type`.
    fn fetch(&self, asset_type: AssetType, symbol: &Symbol) -> Result<Quote>;
}

/// Provider selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Display)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    /// Yahoo Finance chart API.
    #[default]
    Yahoo,
    /// stonks.scd31.com text quotes.
    Stonks,
    /// World Trading Data (requires a token).
    Wtd,
}

/// Build the configured provider with a shared, timeout-bounded HTTP client.
pub fn build_source(
    config: &ExporterConfig,
) -> std::result::Result<Arc<dyn QuoteSource>, ExporterError> {
    let client = http_client(config.upstream_timeout)?;
    let source: Arc<dyn QuoteSource> = match config.provider {
        Provider::Yahoo => Arc::new(yahoo::YahooSource::new(client)),
        Provider::Stonks => Arc::new(stonks::StonksSource::new(client)),
        Provider::Wtd => {
            let token = config.wtd_token.clone().ok_or_else(|| {
                ExporterError::Config("the wtd provider needs a token".to_string())
            })?;
            Arc::new(wtd::WtdSource::new(client, token))
        }
    };
    Ok(source)
}

fn http_client(timeout: Duration) -> std::result::Result<Client, ExporterError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// `base` with `symbol` appended as one escaped path segment, followed by `query`.
fn symbol_url(base: &str, symbol: &Symbol, query: &[(&str, &str)]) -> Result<Url> {
    let segment = symbol.normalized();
    if matches!(segment.as_str(), "." | "..") {
        return Err(QuoteError::MalformedRequest(format!(
            "invalid symbol {:?}",
            segment
        )));
    }
    let invalid = |detail: &str| {
        QuoteError::UpstreamProtocolError(format!("invalid upstream url {}: {}", base, detail))
    };
    let mut url = Url::parse(base).map_err(|e| invalid(&e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("cannot be a base"))?
        .pop_if_empty()
        .push(&segment);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// GET `url` and return the status with the body text. Only transport failures are
/// errors here; providers decide what a non-success status means.
fn get_text(client: &Client, url: Url, symbol: &Symbol) -> Result<(StatusCode, String)> {
    let response = client.get(url).send().map_err(|e| transport_error(symbol, e))?;
    let status = response.status();
    let body = response.text().map_err(|e| transport_error(symbol, e))?;
    Ok((status, body))
}

fn transport_error(symbol: &Symbol, err: reqwest::Error) -> QuoteError {
    // URLs may carry API tokens.
    let err = err.without_url();
    if err.is_timeout() {
        QuoteError::UpstreamUnavailable(format!("timed out fetching {}", symbol))
    } else {
        QuoteError::UpstreamUnavailable(format!("fetching {}: {}", symbol, err))
    }
}

fn status_error(symbol: &Symbol, status: StatusCode) -> QuoteError {
    QuoteError::UpstreamUnavailable(format!("fetching {}: HTTP {}", symbol, status))
}
