//! Resolved quote for a single symbol.
use crate::error::QuoteError;
use crate::result::Result;

/// Last-traded price of an instrument as reported by the upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Symbol as returned by the upstream (used verbatim as a metric label).
    pub symbol: String,
    /// Display name as returned by the upstream.
    pub name: String,
    /// Last-traded price in the instrument's native currency.
    pub price: f64,
    /// Traded volume, when the upstream reports one.
    pub volume: Option<u64>,
}

impl Quote {
    /// Accepts the quote only if its price is finite and strictly positive.
    ///
    /// A price of exactly zero is an upstream anomaly, never a real quote.
    pub fn validated(self) -> Result<Quote> {
        if self.price.is_finite() && self.price > 0.0 {
            Ok(self)
        } else {
            Err(QuoteError::InvalidQuoteValue {
                symbol: self.symbol,
                price: self.price,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64) -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            price,
            volume: None,
        }
    }

    #[test]
    fn positive_price_is_valid() {
        assert_eq!(quote(150.25).validated().unwrap().price, 150.25);
    }

    #[test]
    fn zero_negative_and_non_finite_prices_are_rejected() {
        for price in [0.0, -0.0, -1.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                quote(price).validated(),
                Err(QuoteError::InvalidQuoteValue { .. })
            ));
        }
    }
}
