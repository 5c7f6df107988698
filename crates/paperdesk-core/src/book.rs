//! Order book depth types.
//!
//! Snapshots carry up to ten levels per side. Bids are sorted descending
//! by price, asks ascending, and a consistent book never crosses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Single price level in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLevel {
    pub price: Decimal,
    pub size: u32,
    pub order_count: u32,
}

/// Book consistency state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// Both sides sorted, best bid below best ask.
    Consistent,
    /// One or both sides empty.
    Empty,
    /// Best bid at or above best ask.
    Crossed,
    /// A side violates its sort order.
    Unsorted,
}

/// Level-2 depth snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub bids: Vec<OrderLevel>,
    pub asks: Vec<OrderLevel>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<&OrderLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderLevel> {
        self.asks.first()
    }

    /// Spread between best ask and best bid, when both sides are present.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Determine consistency state.
    pub fn state(&self) -> BookState {
        if self.bids.is_empty() || self.asks.is_empty() {
            return BookState::Empty;
        }
        let bids_sorted = self.bids.windows(2).all(|w| w[0].price >= w[1].price);
        let asks_sorted = self.asks.windows(2).all(|w| w[0].price <= w[1].price);
        if !bids_sorted || !asks_sorted {
            return BookState::Unsorted;
        }
        // first() is Some here, both sides checked non-empty above
        let best_bid = self.bids[0].price;
        let best_ask = self.asks[0].price;
        if best_bid >= best_ask {
            BookState::Crossed
        } else {
            BookState::Consistent
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.state() == BookState::Consistent
    }
}
