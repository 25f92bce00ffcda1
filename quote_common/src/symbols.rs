//! Symbols, asset types and the resolver that turns query parameters into a `QuoteRequest`.
//!
//! Two query formats are understood, selected once at startup through `SymbolFormat`:
//!
//! - `Flat`: `?symbols=AAPL,MSFT&symbols=GOOG`; every symbol is looked up as a stock.
//! - `Typed`: `?symbols=stock:AAPL,MSFT&symbols=fund:VTIAX`; each value names the asset
//!   type of its group with a case-sensitive prefix.
//!
//! Repeated parameters are concatenated in order and comma-separated values are split, so
//! both forms can be mixed freely. Duplicates are kept; repeated lookups are served by
//! the cache.
use std::fmt;

use clap::ValueEnum;
use strum_macros::{Display, EnumString};

use crate::error::QuoteError;
use crate::net::SYMBOLS_PARAM;
use crate::result::Result;

/// Ticker identifying an instrument, kept exactly as the caller typed it (minus
/// surrounding whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// Builds a symbol from raw query text. Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Symbol(trimmed.to_string()))
        }
    }

    /// The symbol as supplied by the caller.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-cased form; two symbols with the same normalized form name the same instrument.
    pub fn normalized(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of instrument; decides which upstream query path serves a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum AssetType {
    /// Listed equities and ETFs (`stock:` prefix).
    #[strum(to_string = "stock", serialize = "stocks")]
    Stock,
    /// Mutual funds (`fund:` prefix).
    #[strum(to_string = "fund", serialize = "funds")]
    MutualFund,
}

/// Query format accepted by the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Display)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase")]
pub enum SymbolFormat {
    /// Plain comma-separated symbols, all treated as stocks.
    #[default]
    Flat,
    /// `type:SYM1,SYM2` groups.
    Typed,
}

/// Symbols sharing one asset type.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGroup {
    /// Asset type of every symbol in the group.
    pub asset_type: AssetType,
    /// Symbols in request order, duplicates preserved.
    pub symbols: Vec<Symbol>,
}

/// Parsed form of one inbound call. Always holds at least one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    groups: Vec<SymbolGroup>,
}

impl QuoteRequest {
    /// Wraps `groups`, rejecting a request without any symbol.
    pub fn new(groups: Vec<SymbolGroup>) -> Result<Self> {
        if groups.iter().all(|g| g.symbols.is_empty()) {
            return Err(QuoteError::MalformedRequest(format!(
                "no symbols in \"{}\"",
                SYMBOLS_PARAM
            )));
        }
        Ok(QuoteRequest { groups })
    }

    /// Groups in request order.
    pub fn groups(&self) -> &[SymbolGroup] {
        &self.groups
    }

    /// Total number of lookups this request asks for.
    pub fn symbol_count(&self) -> usize {
        self.groups.iter().map(|g| g.symbols.len()).sum()
    }

    /// Every `(asset type, symbol)` pair in request order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetType, &Symbol)> {
        self.groups
            .iter()
            .flat_map(|g| g.symbols.iter().map(move |s| (g.asset_type, s)))
    }
}

impl fmt::Display for QuoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let symbols: Vec<&str> = group.symbols.iter().map(Symbol::as_str).collect();
            write!(f, "{}:{}", group.asset_type, symbols.join(","))?;
        }
        Ok(())
    }
}

/// Turns decoded query pairs into a `QuoteRequest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolResolver {
    format: SymbolFormat,
}

impl SymbolResolver {
    /// Creates a resolver for the given query format.
    pub fn new(format: SymbolFormat) -> Self {
        Self { format }
    }

    /// Query format this resolver accepts.
    pub fn format(&self) -> SymbolFormat {
        self.format
    }

    /// Collects every `symbols` parameter from `pairs` into a request.
    ///
    /// Fails with `MalformedRequest` when the parameter is missing, when no symbol is
    /// left after splitting, or (typed format) when any value lacks a known type prefix.
    /// A single bad value rejects the whole request.
    pub fn resolve<I, K, V>(&self, pairs: I) -> Result<QuoteRequest>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let values: Vec<String> = pairs
            .into_iter()
            .filter(|(k, _)| k.as_ref() == SYMBOLS_PARAM)
            .map(|(_, v)| v.as_ref().to_string())
            .collect();

        if values.is_empty() {
            return Err(QuoteError::MalformedRequest(format!(
                "missing \"{}\" in query",
                SYMBOLS_PARAM
            )));
        }

        let groups = match self.format {
            SymbolFormat::Flat => vec![SymbolGroup {
                asset_type: AssetType::Stock,
                symbols: values.iter().flat_map(|v| split_symbols(v)).collect(),
            }],
            SymbolFormat::Typed => values
                .iter()
                .map(|v| parse_typed_group(v))
                .collect::<Result<Vec<_>>>()?,
        };
        QuoteRequest::new(groups)
    }
}

fn split_symbols(value: &str) -> impl Iterator<Item = Symbol> + '_ {
    value.split(',').filter_map(Symbol::new)
}

fn parse_typed_group(value: &str) -> Result<SymbolGroup> {
    let (prefix, list) = value.split_once(':').ok_or_else(|| {
        QuoteError::MalformedRequest(format!("missing type prefix in query: {}", value))
    })?;
    let asset_type: AssetType = prefix
        .parse()
        .map_err(|_| QuoteError::MalformedRequest(format!("unknown type in query: {}", value)))?;
    let symbols: Vec<Symbol> = split_symbols(list).collect();
    if symbols.is_empty() {
        return Err(QuoteError::MalformedRequest(format!(
            "no symbols after type prefix: {}",
            value
        )));
    }
    Ok(SymbolGroup {
        asset_type,
        symbols,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[&str]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|v| (SYMBOLS_PARAM.to_string(), v.to_string()))
            .collect()
    }

    fn names(request: &QuoteRequest) -> Vec<(AssetType, String)> {
        request
            .iter()
            .map(|(t, s)| (t, s.as_str().to_string()))
            .collect()
    }

    #[test]
    fn flat_mixes_repetition_and_commas() {
        let resolver = SymbolResolver::new(SymbolFormat::Flat);
        let request = resolver.resolve(pairs(&["AAPL,MSFT", "GOOG"])).unwrap();
        assert_eq!(request.symbol_count(), 3);
        assert_eq!(
            names(&request),
            vec![
                (AssetType::Stock, "AAPL".to_string()),
                (AssetType::Stock, "MSFT".to_string()),
                (AssetType::Stock, "GOOG".to_string()),
            ]
        );
    }

    #[test]
    fn duplicates_are_preserved() {
        let resolver = SymbolResolver::default();
        let request = resolver.resolve(pairs(&["AAPL,AAPL", "aapl"])).unwrap();
        assert_eq!(request.symbol_count(), 3);
    }

    #[test]
    fn blank_entries_are_skipped() {
        let resolver = SymbolResolver::default();
        let request = resolver.resolve(pairs(&[" AAPL ,, MSFT,"])).unwrap();
        assert_eq!(
            names(&request),
            vec![
                (AssetType::Stock, "AAPL".to_string()),
                (AssetType::Stock, "MSFT".to_string()),
            ]
        );
    }

    #[test]
    fn missing_parameter_is_malformed() {
        let resolver = SymbolResolver::default();
        let other = vec![("other".to_string(), "AAPL".to_string())];
        assert!(matches!(
            resolver.resolve(other),
            Err(QuoteError::MalformedRequest(_))
        ));
    }

    #[test]
    fn empty_parameter_is_malformed() {
        let resolver = SymbolResolver::default();
        assert!(matches!(
            resolver.resolve(pairs(&[""])),
            Err(QuoteError::MalformedRequest(_))
        ));
        assert!(matches!(
            resolver.resolve(pairs(&[",", " "])),
            Err(QuoteError::MalformedRequest(_))
        ));
    }

    #[test]
    fn typed_groups_keep_order_and_type() {
        let resolver = SymbolResolver::new(SymbolFormat::Typed);
        let request = resolver
            .resolve(pairs(&["stock:AMZN,GOOG", "fund:VTIAX", "stocks:SNAP"]))
            .unwrap();
        assert_eq!(request.groups().len(), 3);
        assert_eq!(
            names(&request),
            vec![
                (AssetType::Stock, "AMZN".to_string()),
                (AssetType::Stock, "GOOG".to_string()),
                (AssetType::MutualFund, "VTIAX".to_string()),
                (AssetType::Stock, "SNAP".to_string()),
            ]
        );
        assert_eq!(request.to_string(), "stock:AMZN,GOOG fund:VTIAX stock:SNAP");
    }

    #[test]
    fn typed_prefix_is_case_sensitive() {
        let resolver = SymbolResolver::new(SymbolFormat::Typed);
        assert!(matches!(
            resolver.resolve(pairs(&["Stock:AAPL"])),
            Err(QuoteError::MalformedRequest(_))
        ));
    }

    #[test]
    fn one_bad_typed_value_rejects_the_request() {
        let resolver = SymbolResolver::new(SymbolFormat::Typed);
        for bad in ["AAPL", "bond:AAPL", "stock:", "fund: , "] {
            assert!(
                matches!(
                    resolver.resolve(pairs(&["stock:MSFT", bad])),
                    Err(QuoteError::MalformedRequest(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn symbol_identity_is_case_insensitive() {
        let lower = Symbol::new("brk.b").unwrap();
        let upper = Symbol::new("BRK.B").unwrap();
        assert_eq!(lower.normalized(), upper.normalized());
        assert_eq!(lower.as_str(), "brk.b");
    }
}
