//! Prometheus exporter for stock and mutual fund quotes.
//!
//! Prometheus scrapes `/price?symbols=...`; the exporter resolves the requested symbols,
//! looks each one up through a memoizing cache backed by the configured upstream provider
//! and answers with one price gauge (and optionally one volume gauge) per resolved symbol,
//! together with its own accounting series.
//!
//! Building blocks:
//!
//! - `SymbolResolver` (in `quote_common`) turns the query string into a `QuoteRequest`.
//! - `QuoteCollector` performs the cached lookups and feeds a per-request `MetricsPage`.
//! - `QuoteCache` memoizes upstream results for a freshness window and keeps the last
//!   success around until the retention window ends.
//! - `Accounting` counts queries, failures and lookup latency for the whole process.
//!
//! Concurrency and shutdown:
//! - The HTTP server runs on a tokio runtime; collection runs on its blocking pool.
//! - A sweeper thread evicts expired cache entries and is stopped through a crossbeam
//!   channel once the server has drained after Ctrl+C.
#![warn(missing_docs)]
use crate::args::Args;
use crate::config::ExporterConfig;
use crate::error::ExporterError;
use crate::http::AppState;
use crate::model::cache::spawn_sweeper;
use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info};
use quote_common::net;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

mod args;
mod collector;
mod config;
mod error;
mod exposition;
mod http;
pub mod model;
mod source;

fn main() -> Result<(), ExporterError> {
    init_logger();
    let config = ExporterConfig::from_args(Args::parse(), io::stdin())?;
    info!("Starting with {:?}", config);

    let quote_source = source::build_source(&config)?;
    info!("Using {} quotes", quote_source.id());
    let state = Arc::new(AppState::new(config, quote_source)?);

    let (stop_tx, stop_rx) = bounded::<()>(1);
    let sweeper = spawn_sweeper(
        Arc::clone(&state.cache),
        state.config.cache_sweep_interval,
        stop_rx,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(run(Arc::clone(&state)));
    // Waits for in-flight collections; the blocking HTTP client must not be dropped
    // inside the runtime.
    drop(runtime);

    let accounting = state.accounting();
    info!(
        "Served {} queries: {} failed lookups, {} lookups in {:.3}s",
        accounting.queries(),
        accounting.failures(),
        accounting.duration_count(),
        accounting.duration_sum()
    );

    let _ = stop_tx.send(());
    if sweeper.join().is_err() {
        error!("Cache sweeper panicked");
    }
    served
}

async fn run(state: Arc<AppState>) -> Result<(), ExporterError> {
    let listener = TcpListener::bind(net::addr("0.0.0.0", state.config.port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    http::serve(listener, state, shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received. Shutting down...");
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
