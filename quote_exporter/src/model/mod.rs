//! Shared state of the exporter.
//!
//! - `cache`: memoizing cache in front of the quote source, plus its sweeper thread.
//! - `accounting`: process-wide query, failure and latency registers.
//! - `sample`: typed metric samples produced by the collector.

pub mod accounting;
pub mod cache;
pub mod sample;
