//! Synthetic quote engine.
//!
//! Mean-reverting random walk over a fixed demo universe, used whenever
//! the upstream provider cannot serve a symbol. Never fails: symbols
//! outside the universe walk from a default base. Per-symbol timestamps
//! are strictly increasing.

use chrono::Utc;
use dashmap::DashMap;
use paperdesk_core::{Market, OrderBookSnapshot, OrderLevel, Quote, QuoteSource};
use rand::Rng;
use rand_distr::StandardNormal;
use rust_decimal::Decimal;

/// One instrument of the demo universe.
#[derive(Debug, Clone, Copy)]
pub struct DemoInstrument {
    pub symbol: &'static str,
    pub base: f64,
    pub volatility: f64,
}

/// Fixed demo universe streamed on the ticker tape.
pub static DEMO_UNIVERSE: &[DemoInstrument] = &[
    DemoInstrument { symbol: "SPY", base: 562.45, volatility: 0.002 },
    DemoInstrument { symbol: "QQQ", base: 485.32, volatility: 0.003 },
    DemoInstrument { symbol: "AAPL", base: 228.52, volatility: 0.004 },
    DemoInstrument { symbol: "MSFT", base: 415.26, volatility: 0.003 },
    DemoInstrument { symbol: "GOOGL", base: 175.48, volatility: 0.005 },
    DemoInstrument { symbol: "TSLA", base: 242.84, volatility: 0.008 },
    DemoInstrument { symbol: "NVDA", base: 145.89, volatility: 0.006 },
    DemoInstrument { symbol: "META", base: 567.12, volatility: 0.005 },
    DemoInstrument { symbol: "AMZN", base: 196.43, volatility: 0.004 },
    DemoInstrument { symbol: "BTC-USD", base: 76543.21, volatility: 0.015 },
    DemoInstrument { symbol: "ETH-USD", base: 2845.67, volatility: 0.012 },
    DemoInstrument { symbol: "GC=F", base: 2765.30, volatility: 0.002 },
    DemoInstrument { symbol: "CL=F", base: 75.42, volatility: 0.008 },
];

/// Base price for symbols outside the demo universe.
const DEFAULT_BASE: f64 = 100.0;

/// Volatility for symbols outside the demo universe.
const DEFAULT_VOLATILITY: f64 = 0.005;

/// Fraction of the relative gap to base pulled back per step.
const REVERSION_STRENGTH: f64 = 0.01;

/// Half of the quoted spread sits on each side of the price.
const SPREAD_RATIO: f64 = 0.0001;

/// Walked prices never fall below this.
const PRICE_FLOOR: f64 = 0.01;

/// Depth levels per book side.
const BOOK_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy)]
struct WalkState {
    price: f64,
    timestamp_ms: i64,
}

/// Random-walk generator with per-symbol state.
pub struct SyntheticEngine {
    state: DashMap<String, WalkState>,
}

impl SyntheticEngine {
    pub fn new() -> Self {
        Self {
            state: DashMap::new(),
        }
    }

    /// Symbols of the demo universe in tape order.
    pub fn universe_symbols() -> Vec<&'static str> {
        DEMO_UNIVERSE.iter().map(|i| i.symbol).collect()
    }

    fn parameters(symbol: &str) -> (f64, f64) {
        DEMO_UNIVERSE
            .iter()
            .find(|i| i.symbol == symbol)
            .map(|i| (i.base, i.volatility))
            .unwrap_or((DEFAULT_BASE, DEFAULT_VOLATILITY))
    }

    /// Advance the walk one step and return the new quote.
    pub fn next_quote(&self, symbol: &str, market: Market) -> Quote {
        let (base, volatility) = Self::parameters(symbol);
        let prev = self.state.get(symbol).map(|s| *s);
        let prev_price = prev.map(|s| s.price).unwrap_or(base);

        let mut rng = rand::rng();
        let change_pct: f64 = rng.sample::<f64, _>(StandardNormal) * volatility;
        let reversion = (base / prev_price - 1.0) * REVERSION_STRENGTH;
        let price = (prev_price * (1.0 + change_pct + reversion)).max(PRICE_FLOOR);

        let change = price - prev_price;
        let change_percent = change / prev_price * 100.0;
        let spread = price * SPREAD_RATIO;
        let volume: u64 = rng.random_range(100_000..=5_000_000);

        let now_ms = Utc::now().timestamp_millis();
        let timestamp_ms = match prev {
            Some(s) => now_ms.max(s.timestamp_ms + 1),
            None => now_ms,
        };
        self.state
            .insert(symbol.to_string(), WalkState { price, timestamp_ms });

        Quote {
            symbol: symbol.to_string(),
            market,
            price: round2(price),
            change: round2(change),
            change_percent: round3(change_percent),
            bid: Some(round2(price - spread / 2.0)),
            ask: Some(round2(price + spread / 2.0)),
            high: None,
            low: None,
            open: None,
            prev_close: Some(round2(prev_price)),
            volume: Some(volume),
            timestamp_ms,
            source: Some(QuoteSource::Synthetic),
        }
    }

    /// Synthesize a ten-level book around the current walked price.
    pub fn order_book(&self, symbol: &str) -> OrderBookSnapshot {
        let (base, _) = Self::parameters(symbol);
        let price = self
            .state
            .get(symbol)
            .map(|s| s.price)
            .unwrap_or(base);

        let mut rng = rand::rng();
        let mut bids = Vec::with_capacity(BOOK_DEPTH);
        let mut asks = Vec::with_capacity(BOOK_DEPTH);
        for i in 0..BOOK_DEPTH {
            let offset = SPREAD_RATIO * (i + 1) as f64;
            bids.push(OrderLevel {
                price: round2(price * (1.0 - offset)),
                size: rng.random_range(100..=5000),
                order_count: rng.random_range(1..=10),
            });
            asks.push(OrderLevel {
                price: round2(price * (1.0 + offset)),
                size: rng.random_range(100..=5000),
                order_count: rng.random_range(1..=10),
            });
        }

        OrderBookSnapshot {
            symbol: symbol.to_string(),
            bids,
            asks,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

impl Default for SyntheticEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

fn round3(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdesk_core::BookState;
    use rust_decimal_macros::dec;

    #[test]
    fn test_universe_has_thirteen_symbols() {
        assert_eq!(DEMO_UNIVERSE.len(), 13);
        assert_eq!(DEMO_UNIVERSE[0].symbol, "SPY");
        assert_eq!(DEMO_UNIVERSE[0].base, 562.45);
    }

    #[test]
    fn test_walk_stays_positive_at_high_volatility() {
        let engine = SyntheticEngine::new();
        for _ in 0..1000 {
            let quote = engine.next_quote("BTC-USD", Market::Us);
            assert!(quote.price > Decimal::ZERO, "price went non-positive");
        }
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let engine = SyntheticEngine::new();
        let mut last = 0i64;
        for _ in 0..50 {
            let quote = engine.next_quote("SPY", Market::Us);
            assert!(quote.timestamp_ms > last);
            last = quote.timestamp_ms;
        }
    }

    #[test]
    fn test_quote_rounding_and_spread() {
        let engine = SyntheticEngine::new();
        let quote = engine.next_quote("AAPL", Market::Us);
        assert!(quote.price.scale() <= 2);
        assert!(quote.change_percent.scale() <= 3);
        let bid = quote.bid.unwrap();
        let ask = quote.ask.unwrap();
        assert!(bid <= quote.price);
        assert!(ask >= quote.price);
    }

    #[test]
    fn test_unknown_symbol_walks_from_default_base() {
        let engine = SyntheticEngine::new();
        let quote = engine.next_quote("ZZZT", Market::Us);
        // One step from base 100 stays in a narrow band
        assert!(quote.price > dec!(90) && quote.price < dec!(110));
    }

    #[test]
    fn test_order_book_shape() {
        let engine = SyntheticEngine::new();
        let book = engine.order_book("MSFT");
        assert_eq!(book.bids.len(), 10);
        assert_eq!(book.asks.len(), 10);
        assert_eq!(book.state(), BookState::Consistent);
        for level in book.bids.iter().chain(book.asks.iter()) {
            assert!((100..=5000).contains(&level.size));
            assert!((1..=10).contains(&level.order_count));
        }
    }

    #[test]
    fn test_order_book_tracks_walked_price() {
        let engine = SyntheticEngine::new();
        let quote = engine.next_quote("SPY", Market::Us);
        let book = engine.order_book("SPY");
        let best_bid = book.best_bid().unwrap().price;
        let best_ask = book.best_ask().unwrap().price;
        assert!(best_bid < quote.price + dec!(1));
        assert!(best_ask > quote.price - dec!(1));
    }
}
