//!
//! Common types shared by the quotes exporter.
//!
//! This crate aggregates:
//! - `error`: the `QuoteError` taxonomy for requests and symbol lookups.
//! - `result`: handy `Result<T, QuoteError>` alias.
//! - `symbols`: symbols, asset types and the query-parameter resolver.
//! - `quote`: the resolved `Quote` and its price validation.
//! - `net`: HTTP defaults (port, routes, query parameter name).
#![warn(missing_docs)]
pub mod error;
pub mod result;
pub mod symbols;
pub mod quote;
pub mod net;

pub use error::QuoteError;
pub use result::Result;
pub use quote::Quote;
pub use symbols::{AssetType, QuoteRequest, Symbol, SymbolFormat, SymbolResolver};
