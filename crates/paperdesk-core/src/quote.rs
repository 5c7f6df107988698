//! Normalized quote type.
//!
//! A `Quote` is produced by the provider adapter on each fetch or push
//! tick. Quotes are superseded, never mutated in place.

use crate::Market;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    /// Fetched from the external market-data provider.
    Upstream,
    /// Generated by the synthetic engine (provider fallback or demo).
    Synthetic,
}

impl fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => write!(f, "upstream"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Normalized quote for a `(symbol, market)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub market: Market,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_close: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<QuoteSource>,
}

impl Quote {
    /// A quote is valid when its price is strictly positive.
    pub fn is_valid(&self) -> bool {
        self.price > Decimal::ZERO
    }

    /// Bid/ask spread, when both sides are present.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Tag this quote with a source, returning the modified quote.
    pub fn with_source(mut self, source: QuoteSource) -> Self {
        self.source = Some(source);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(price: Decimal) -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            market: Market::Us,
            price,
            change: dec!(1.25),
            change_percent: dec!(0.55),
            bid: Some(price - dec!(0.01)),
            ask: Some(price + dec!(0.01)),
            high: None,
            low: None,
            open: None,
            prev_close: None,
            volume: Some(1_000_000),
            timestamp_ms: 1_700_000_000_000,
            source: None,
        }
    }

    #[test]
    fn test_quote_validity() {
        assert!(quote(dec!(228.52)).is_valid());
        assert!(!quote(Decimal::ZERO).is_valid());
    }

    #[test]
    fn test_quote_spread() {
        let q = quote(dec!(100));
        assert_eq!(q.spread().unwrap(), dec!(0.02));

        let mut no_bid = q.clone();
        no_bid.bid = None;
        assert!(no_bid.spread().is_none());
    }

    #[test]
    fn test_source_tagging_and_wire_format() {
        let q = quote(dec!(100)).with_source(QuoteSource::Synthetic);
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("\"source\":\"synthetic\""));

        // Optional fields absent from the payload stay None on decode
        let decoded: Quote =
            serde_json::from_str(r#"{"symbol":"SPY","market":"US","price":"562.45","change":"0.5","change_percent":"0.09","timestamp_ms":1700000000000}"#)
                .unwrap();
        assert!(decoded.bid.is_none());
        assert!(decoded.source.is_none());
    }
}
