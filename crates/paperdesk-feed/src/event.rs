//! Typed feed frames.
//!
//! The wire protocol is JSON text frames tagged by a `type` field:
//! `{"type": "quote", "data": {...}}`, `{"type": "orderbook", "symbol",
//! "bids", "asks", "timestamp_ms"}` and `{"type": "tickers", "data": [...],
//! "timestamp_ms"}`. Frames with an unrecognized `type` are ignored so the
//! protocol can grow without breaking old subscribers; frames that fail to
//! decode are dropped by the channel, never fatal.

use crate::error::{FeedError, FeedResult};
use paperdesk_core::{OrderBookSnapshot, Quote};
use serde::Deserialize;

/// Decoded feed event.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Single-symbol quote push.
    Quote(Quote),
    /// Depth snapshot push.
    OrderBook(OrderBookSnapshot),
    /// Whole-universe ticker sweep.
    Tickers { data: Vec<Quote>, timestamp_ms: i64 },
}

impl FeedEvent {
    /// Metric label for the frame kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Quote(_) => "quote",
            Self::OrderBook(_) => "orderbook",
            Self::Tickers { .. } => "tickers",
        }
    }

    /// Symbol the event applies to (`None` for ticker sweeps).
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Quote(q) => Some(&q.symbol),
            Self::OrderBook(b) => Some(&b.symbol),
            Self::Tickers { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuoteFrame {
    data: Quote,
}

#[derive(Debug, Deserialize)]
struct TickersFrame {
    data: Vec<Quote>,
    timestamp_ms: i64,
}

/// Decode one wire frame.
///
/// Returns `Ok(None)` for frames carrying an unrecognized `type`.
pub fn decode_frame(text: &str) -> FeedResult<Option<FeedEvent>> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    let frame_type = match value.get("type").and_then(|v| v.as_str()) {
        Some(t) => t.to_string(),
        None => return Err(FeedError::MalformedFrame("missing type field".to_string())),
    };

    match frame_type.as_str() {
        "quote" => {
            let frame: QuoteFrame = serde_json::from_value(value)?;
            Ok(Some(FeedEvent::Quote(frame.data)))
        }
        "orderbook" => {
            let book: OrderBookSnapshot = serde_json::from_value(value)?;
            Ok(Some(FeedEvent::OrderBook(book)))
        }
        "tickers" => {
            let frame: TickersFrame = serde_json::from_value(value)?;
            Ok(Some(FeedEvent::Tickers {
                data: frame.data,
                timestamp_ms: frame.timestamp_ms,
            }))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdesk_core::Market;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_decode_quote_frame() {
        let frame = json!({
            "type": "quote",
            "data": {
                "symbol": "AAPL",
                "market": "US",
                "price": "228.52",
                "change": "1.25",
                "change_percent": "0.55",
                "timestamp_ms": 1_700_000_000_000i64,
                "source": "synthetic"
            }
        });

        let event = decode_frame(&frame.to_string()).unwrap().unwrap();
        assert_eq!(event.label(), "quote");
        assert_eq!(event.symbol(), Some("AAPL"));
        match event {
            FeedEvent::Quote(q) => {
                assert_eq!(q.price, dec!(228.52));
                assert_eq!(q.market, Market::Us);
            }
            other => panic!("expected quote event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_orderbook_frame() {
        let frame = json!({
            "type": "orderbook",
            "symbol": "SPY",
            "bids": [{"price": "562.39", "size": 1200, "order_count": 4}],
            "asks": [{"price": "562.51", "size": 800, "order_count": 2}],
            "timestamp_ms": 1_700_000_000_000i64
        });

        let event = decode_frame(&frame.to_string()).unwrap().unwrap();
        assert_eq!(event.label(), "orderbook");
        assert_eq!(event.symbol(), Some("SPY"));
        match event {
            FeedEvent::OrderBook(book) => {
                assert_eq!(book.best_bid().unwrap().price, dec!(562.39));
                assert_eq!(book.best_ask().unwrap().size, 800);
                assert_eq!(book.timestamp_ms, 1_700_000_000_000);
            }
            other => panic!("expected orderbook event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_tickers_frame() {
        let frame = json!({
            "type": "tickers",
            "data": [
                {
                    "symbol": "AAPL",
                    "market": "US",
                    "price": "228.52",
                    "change": "1.25",
                    "change_percent": "0.55",
                    "timestamp_ms": 1_700_000_000_000i64
                },
                {
                    "symbol": "RELIANCE",
                    "market": "IN",
                    "price": "2941.10",
                    "change": "-12.40",
                    "change_percent": "-0.42",
                    "timestamp_ms": 1_700_000_000_000i64
                }
            ],
            "timestamp_ms": 1_700_000_000_123i64
        });

        let event = decode_frame(&frame.to_string()).unwrap().unwrap();
        assert_eq!(event.label(), "tickers");
        assert_eq!(event.symbol(), None);
        match event {
            FeedEvent::Tickers { data, timestamp_ms } => {
                assert_eq!(data.len(), 2);
                assert_eq!(data[1].market, Market::In);
                assert_eq!(timestamp_ms, 1_700_000_000_123);
            }
            other => panic!("expected tickers event, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let event = decode_frame(r#"{"type":"heartbeat","data":{}}"#).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        // Not JSON at all
        assert!(decode_frame("not json at all").is_err());
        // Missing the type tag
        assert!(decode_frame(r#"{"data":{}}"#).is_err());
        // Known type without its payload
        assert!(decode_frame(r#"{"type":"quote"}"#).is_err());
        // Payload missing required quote fields must not decode to zeros
        assert!(decode_frame(r#"{"type":"quote","data":{"symbol":"AAPL"}}"#).is_err());
    }
}
