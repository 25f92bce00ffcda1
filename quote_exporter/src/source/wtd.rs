//! World Trading Data quotes.
//!
//! Stocks and mutual funds live under different endpoints. The API reports its own
//! failures (bad token, unknown symbol, quota) with HTTP 200 and a `message` instead of a
//! `data` array, and encodes every number as a string.
use quote_common::{AssetType, Quote, QuoteError, Result, Symbol};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{QuoteSource, status_error, transport_error};

const WTD_URL: &str = "https://api.worldtradingdata.com/api/v1/";

/// Quotes from the World Trading Data API.
pub struct WtdSource {
    client: Client,
    token: String,
}

impl WtdSource {
    /// Wrap a configured HTTP client and the API token.
    pub fn new(client: Client, token: String) -> Self {
        Self { client, token }
    }
}

fn endpoint(asset_type: AssetType) -> &'static str {
    match asset_type {
        AssetType::Stock => "stock",
        AssetType::MutualFund => "mutualfund",
    }
}

impl QuoteSource for WtdSource {
    fn id(&self) -> &'static str {
        "wtd"
    }

    fn fetch(&self, asset_type: AssetType, symbol: &Symbol) -> Result<Quote> {
        let url = format!("{}{}", WTD_URL, endpoint(asset_type));
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.as_str()), ("api_token", self.token.as_str())])
            .send()
            .map_err(|e| transport_error(symbol, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(symbol, status));
        }
        let body = response.text().map_err(|e| transport_error(symbol, e))?;
        parse_reply(symbol, &body)
    }
}

#[derive(Debug, Deserialize)]
struct WtdReply {
    data: Option<Vec<WtdAsset>>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WtdAsset {
    symbol: String,
    name: Option<String>,
    price: String,
    volume: Option<String>,
}

fn parse_reply(symbol: &Symbol, body: &str) -> Result<Quote> {
    let reply: WtdReply = serde_json::from_str(body).map_err(|e| {
        QuoteError::UpstreamProtocolError(format!("unable to decode reply for {}: {}", symbol, e))
    })?;

    let Some(data) = reply.data else {
        return Err(QuoteError::UpstreamProtocolError(format!(
            "invalid response for {}: {}",
            symbol,
            reply.message.unwrap_or_else(|| body.to_string())
        )));
    };

    let asset = data
        .into_iter()
        .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol.as_str()))
        .ok_or_else(|| {
            QuoteError::UpstreamProtocolError(format!("{} missing from reply", symbol))
        })?;

    let price: f64 = asset.price.trim().parse().map_err(|e| {
        QuoteError::UpstreamProtocolError(format!(
            "error converting price {:?} of {}: {}",
            asset.price, symbol, e
        ))
    })?;
    let volume = asset.volume.and_then(|v| v.trim().parse().ok());
    let name = asset.name.unwrap_or_else(|| asset.symbol.clone());

    Ok(Quote {
        symbol: asset.symbol,
        name,
        price,
        volume,
    })
}
