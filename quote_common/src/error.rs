//! Error types shared between the resolver, the quote sources and the collector.
//!
//! `QuoteError` is the whole failure taxonomy of a quote lookup. It is `Clone` so a
//! failed lookup can be stored in the cache and replayed to every caller that hits the
//! same entry inside its freshness window.
use thiserror::Error;

/// Failure of a request or of a single symbol lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    /// The inbound symbol list is absent, empty or carries an unknown type prefix.
    /// Fatal to the whole request.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Network or transport failure reaching the upstream (including timeouts and
    /// non-success HTTP statuses).
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream answered but the body could not be decoded into a quote.
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocolError(String),

    /// A structurally valid quote with a price that cannot be a last-traded price.
    #[error("Invalid quote value for {symbol}: price={price}")]
    InvalidQuoteValue {
        /// Symbol as reported by the upstream.
        symbol: String,
        /// The rejected price.
        price: f64,
    },
}
