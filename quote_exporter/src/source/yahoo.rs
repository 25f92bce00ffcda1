//! Yahoo Finance chart endpoint.
//!
//! The `meta` block of a one-day chart carries the last-traded price, the session volume
//! and the instrument names, which is all the exporter needs. Unknown symbols come back as
//! a 404 whose JSON body explains the failure, so the body is decoded before the status
//! is looked at.
use log::debug;
use quote_common::{AssetType, Quote, QuoteError, Result, Symbol};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{QuoteSource, get_text, status_error, symbol_url};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";

/// Quotes from the Yahoo Finance chart API.
pub struct YahooSource {
    client: Client,
}

impl YahooSource {
    /// Wrap a configured HTTP client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl QuoteSource for YahooSource {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    fn fetch(&self, _asset_type: AssetType, symbol: &Symbol) -> Result<Quote> {
        let url = symbol_url(CHART_URL, symbol, &[("interval", "1d"), ("range", "1d")])?;
        let (status, body) = get_text(&self.client, url, symbol)?;
        debug!("Yahoo answered {} for {}", status, symbol);
        match parse_chart(symbol, &body) {
            Err(QuoteError::UpstreamProtocolError(_)) if !status.is_success() => {
                Err(status_error(symbol, status))
            }
            other => other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartReply {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    short_name: Option<String>,
    long_name: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_volume: Option<u64>,
}

fn parse_chart(symbol: &Symbol, body: &str) -> Result<Quote> {
    let reply: ChartReply = serde_json::from_str(body).map_err(|e| {
        QuoteError::UpstreamProtocolError(format!("unable to decode chart for {}: {}", symbol, e))
    })?;

    if let Some(err) = reply.chart.error {
        return Err(QuoteError::UpstreamProtocolError(format!(
            "{} for {}: {}",
            err.code, symbol, err.description
        )));
    }

    let meta = reply
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|result| result.meta)
        .ok_or_else(|| {
            QuoteError::UpstreamProtocolError(format!("empty chart result for {}", symbol))
        })?;

    let price = meta.regular_market_price.ok_or_else(|| {
        QuoteError::UpstreamProtocolError(format!("no market price for {}", symbol))
    })?;
    let name = meta
        .short_name
        .or(meta.long_name)
        .unwrap_or_else(|| meta.symbol.clone());

    Ok(Quote {
        symbol: meta.symbol,
        name,
        price,
        volume: meta.regular_market_volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    #[test]
    fn decodes_chart_meta() {
        let body = r#"{"chart":{"result":[{"meta":{"currency":"USD","symbol":"AAPL",
            "regularMarketPrice":150.25,"regularMarketVolume":51234567,
            "longName":"Apple Inc.","shortName":"Apple Inc."},"timestamp":[1700000000]}],
            "error":null}}"#;
        let quote = parse_chart(&symbol("aapl"), body).unwrap();
        assert_eq!(
            quote,
            Quote {
                symbol: "AAPL".to_string(),
                name: "Apple Inc.".to_string(),
                price: 150.25,
                volume: Some(51234567),
            }
        );
    }

    #[test]
    fn falls_back_to_long_name_then_symbol() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"VTIAX",
            "regularMarketPrice":33.1,"longName":"Vanguard Total Intl Stock Index Admiral"}}],
            "error":null}}"#;
        let quote = parse_chart(&symbol("VTIAX"), body).unwrap();
        assert_eq!(quote.name, "Vanguard Total Intl Stock Index Admiral");
        assert_eq!(quote.volume, None);

        let body = r#"{"chart":{"result":[{"meta":{"symbol":"X","regularMarketPrice":1.0}}],
            "error":null}}"#;
        assert_eq!(parse_chart(&symbol("X"), body).unwrap().name, "X");
    }

    #[test]
    fn error_payload_is_a_protocol_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found",
            "description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(&symbol("ZZZZ"), body).unwrap_err();
        assert!(matches!(err, QuoteError::UpstreamProtocolError(ref m) if m.contains("Not Found")));
    }

    #[test]
    fn missing_price_or_garbage_is_a_protocol_error() {
        let no_price = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL"}}],"error":null}}"#;
        for body in [no_price, "<html>rate limited</html>", r#"{"chart":{"result":[]}}"#] {
            assert!(matches!(
                parse_chart(&symbol("AAPL"), body),
                Err(QuoteError::UpstreamProtocolError(_))
            ));
        }
    }
}
