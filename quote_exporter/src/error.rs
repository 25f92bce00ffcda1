//! Startup and serving errors of the exporter binary.
//!
//! Per-symbol and per-request failures are `QuoteError`s and never leave the request that
//! caused them. `ExporterError` covers what can stop the process: bad configuration,
//! failing to build the HTTP client or the metrics registry, and I/O on the listener.
use std::io;

use thiserror::Error;

use crate::model::cache::InvalidWindows;

/// Unified error type for process setup and the HTTP server.
#[derive(Error, Debug)]
pub enum ExporterError {
    /// I/O error (binding the listener, reading the token from stdin, serving).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid combination of command-line options.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache windows that violate `retention >= freshness`.
    #[error("Cache configuration error: {0}")]
    CacheWindows(#[from] InvalidWindows),

    /// The upstream HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Metric registration or encoding failed.
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
