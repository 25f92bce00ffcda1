//! stonks.scd31.com plain-text quotes.
//!
//! The first line of the reply looks like `AMD: $127.03 +5.55%`. The service knows no
//! display names or volumes, so the symbol doubles as the name.
use log::debug;
use quote_common::{AssetType, Quote, QuoteError, Result, Symbol};
use reqwest::blocking::Client;

use super::{QuoteSource, get_text, status_error, symbol_url};

const STONKS_URL: &str = "https://stonks.scd31.com/";

/// Quotes from stonks.scd31.com.
pub struct StonksSource {
    client: Client,
}

impl StonksSource {
    /// Wrap a configured HTTP client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl QuoteSource for StonksSource {
    fn id(&self) -> &'static str {
        "stonks"
    }

    fn fetch(&self, _asset_type: AssetType, symbol: &Symbol) -> Result<Quote> {
        let upper = symbol.normalized();
        let url = symbol_url(STONKS_URL, symbol, &[("f", "i3")])?;
        let (status, body) = get_text(&self.client, url, symbol)?;
        if !status.is_success() {
            return Err(status_error(symbol, status));
        }
        parse_reply(&upper, &body)
    }
}

fn parse_reply(symbol: &str, body: &str) -> Result<Quote> {
    let line = body.lines().next().unwrap_or_default().trim_end();
    debug!("Results from stonks: {}", line);

    if line.is_empty() {
        return Err(QuoteError::UpstreamProtocolError(format!(
            "empty results for {}",
            symbol
        )));
    }
    let prefix = format!("{}:", symbol);
    if !line.starts_with(&prefix) {
        return Err(QuoteError::UpstreamProtocolError(format!(
            "missing symbol name on output (invalid symbol?): {}",
            line
        )));
    }

    let raw = line.split_whitespace().nth(1).ok_or_else(|| {
        QuoteError::UpstreamProtocolError(format!("error parsing quote results: {}", line))
    })?;
    let price: f64 = raw
        .trim_start_matches('$')
        .replace(',', "")
        .parse()
        .map_err(|e| {
            QuoteError::UpstreamProtocolError(format!("bad price {:?} for {}: {}", raw, symbol, e))
        })?;

    Ok(Quote {
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        price,
        volume: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_line() {
        let quote = parse_reply("AMD", "AMD: $127.03 +5.55%\r\nsecond line\n").unwrap();
        assert_eq!(quote.symbol, "AMD");
        assert_eq!(quote.name, "AMD");
        assert_eq!(quote.price, 127.03);
        assert_eq!(quote.volume, None);
    }

    #[test]
    fn strips_thousands_separators() {
        let quote = parse_reply("BRK.A", "BRK.A: $1,234,567.50 -0.10%").unwrap();
        assert_eq!(quote.price, 1_234_567.5);
    }

    #[test]
    fn zero_price_decodes_but_fails_validation() {
        let quote = parse_reply("DEAD", "DEAD: $0.00 +0.00%").unwrap();
        assert!(matches!(
            quote.validated(),
            Err(QuoteError::InvalidQuoteValue { .. })
        ));
    }

    #[test]
    fn malformed_replies_are_protocol_errors() {
        for body in ["", "\n", "MSFT: $300.00", "AMD:", "AMD: $abc +1%"] {
            assert!(
                matches!(
                    parse_reply("AMD", body),
                    Err(QuoteError::UpstreamProtocolError(_))
                ),
                "{body:?} should be rejected"
            );
        }
    }
}
