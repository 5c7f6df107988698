//! View models for trading dashboards.
//!
//! Pure projections of wire types into the row shapes a UI renders
//! directly. `TickerBoard` additionally folds a stream of feed events
//! into per-symbol rows, dropping out-of-order updates.

use std::collections::BTreeMap;

use paperdesk_core::{Market, PortfolioSnapshot, Quote};
use paperdesk_feed::FeedEvent;
use rust_decimal::Decimal;

use crate::api::TradeIntent;

/// One watchlist line: symbol, last price, percent move.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistRow {
    pub symbol: String,
    pub market: Market,
    pub price: Decimal,
    pub change_percent: Decimal,
}

impl WatchlistRow {
    pub fn from_quote(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            market: quote.market,
            price: quote.price,
            change_percent: quote.change_percent,
        }
    }

    /// Flat or up on the period. Drives the row color.
    pub fn is_gaining(&self) -> bool {
        self.change_percent >= Decimal::ZERO
    }
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }
}

/// One holdings-table line.
///
/// Shares and exposure are presented unsigned, with the direction
/// split out into `side`. Unrealized P&L keeps its sign.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow {
    pub symbol: String,
    pub market: Market,
    pub side: PositionSide,
    pub shares: Decimal,
    pub avg_price: Decimal,
    pub current_price: Option<Decimal>,
    pub current_value: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub borrow_rate_annual: Option<Decimal>,
}

/// Project a snapshot's positions into table rows.
pub fn position_rows(snapshot: &PortfolioSnapshot) -> Vec<PositionRow> {
    snapshot
        .positions
        .iter()
        .map(|pos| PositionRow {
            symbol: pos.symbol.clone(),
            market: pos.market,
            side: if pos.is_short() {
                PositionSide::Short
            } else {
                PositionSide::Long
            },
            shares: pos.shares.abs(),
            avg_price: pos.avg_price,
            current_price: pos.current_price,
            current_value: pos.current_value.map(|v| v.abs()),
            unrealized_pnl: pos.unrealized_pnl,
            borrow_rate_annual: pos.borrow_rate_annual,
        })
        .collect()
}

/// Pre-submission summary for the order ticket.
///
/// Estimated from the latest quote; the actual fill price is decided
/// server-side at execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketPreview {
    pub intent: TradeIntent,
    pub symbol: String,
    pub market: Market,
    pub qty: Decimal,
    pub quote_price: Decimal,
    /// Notional at the quoted price.
    pub estimated_total: Decimal,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub spread: Option<Decimal>,
}

impl TicketPreview {
    pub fn build(intent: TradeIntent, qty: Decimal, quote: &Quote) -> Self {
        Self {
            intent,
            symbol: quote.symbol.clone(),
            market: quote.market,
            qty,
            quote_price: quote.price,
            estimated_total: qty * quote.price,
            bid: quote.bid,
            ask: quote.ask,
            spread: quote.spread(),
        }
    }
}

/// Latest quote per symbol, folded from live feed events.
///
/// Per symbol, a frame older than or tied with what the board already
/// holds never replaces it. Depth frames are not tracked here.
#[derive(Debug, Default)]
pub struct TickerBoard {
    quotes: BTreeMap<String, Quote>,
}

impl TickerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in. Returns how many rows changed.
    pub fn apply(&mut self, event: &FeedEvent) -> usize {
        match event {
            FeedEvent::Quote(quote) => self.absorb(quote),
            FeedEvent::Tickers { data, .. } => data.iter().map(|q| self.absorb(q)).sum(),
            FeedEvent::OrderBook(_) => 0,
        }
    }

    fn absorb(&mut self, quote: &Quote) -> usize {
        match self.quotes.get(&quote.symbol) {
            Some(held) if quote.timestamp_ms <= held.timestamp_ms => 0,
            _ => {
                self.quotes.insert(quote.symbol.clone(), quote.clone());
                1
            }
        }
    }

    /// Latest quote held for a symbol.
    pub fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// All rows, sorted by symbol.
    pub fn rows(&self) -> Vec<WatchlistRow> {
        self.quotes.values().map(WatchlistRow::from_quote).collect()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdesk_core::{OrderBookSnapshot, Position};
    use rust_decimal_macros::dec;

    fn quote(symbol: &str, price: Decimal, timestamp_ms: i64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
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
            volume: None,
            timestamp_ms,
            source: None,
        }
    }

    #[test]
    fn test_watchlist_row_projection() {
        let row = WatchlistRow::from_quote(&quote("AAPL", dec!(228.52), 1));
        assert_eq!(row.symbol, "AAPL");
        assert_eq!(row.price, dec!(228.52));
        assert!(row.is_gaining());

        let mut down = quote("TSLA", dec!(242.84), 1);
        down.change_percent = dec!(-1.2);
        assert!(!WatchlistRow::from_quote(&down).is_gaining());
    }

    #[test]
    fn test_position_rows_split_direction() {
        let long = Position::new("AAPL", Market::Us, dec!(10), dec!(220)).enriched(dec!(228.52));
        let mut short = Position::new("TSLA", Market::Us, dec!(-20), dec!(250)).enriched(dec!(242.84));
        short.borrow_rate_annual = Some(dec!(0.0365));

        let snapshot = PortfolioSnapshot {
            cash_balance: dec!(102800),
            equity: dec!(100228.40),
            maintenance_required: dec!(1457.040),
            maintenance_rate: dec!(0.3),
            margin_headroom: dec!(98771.360),
            in_margin_call: false,
            positions: vec![long, short],
        };

        let rows = position_rows(&snapshot);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].side, PositionSide::Long);
        assert_eq!(rows[0].shares, dec!(10));
        assert_eq!(rows[0].side.as_str(), "LONG");

        assert_eq!(rows[1].side, PositionSide::Short);
        // Shares and exposure unsigned, profit keeps its sign
        assert_eq!(rows[1].shares, dec!(20));
        assert_eq!(rows[1].current_value, Some(dec!(4856.80)));
        assert_eq!(rows[1].unrealized_pnl, Some(dec!(143.20)));
        assert_eq!(rows[1].borrow_rate_annual, Some(dec!(0.0365)));
    }

    #[test]
    fn test_ticket_preview_totals() {
        let preview = TicketPreview::build(TradeIntent::Buy, dec!(10), &quote("AAPL", dec!(228.52), 1));
        assert_eq!(preview.estimated_total, dec!(2285.20));
        assert_eq!(preview.quote_price, dec!(228.52));
        assert_eq!(preview.spread, Some(dec!(0.02)));
        assert_eq!(preview.intent, TradeIntent::Buy);
    }

    #[test]
    fn test_board_keeps_newest_quote() {
        let mut board = TickerBoard::new();
        assert_eq!(board.apply(&FeedEvent::Quote(quote("AAPL", dec!(228.52), 100))), 1);
        assert_eq!(board.apply(&FeedEvent::Quote(quote("AAPL", dec!(229.00), 200))), 1);
        // Regression and duplicate timestamps are dropped
        assert_eq!(board.apply(&FeedEvent::Quote(quote("AAPL", dec!(1.00), 150))), 0);
        assert_eq!(board.apply(&FeedEvent::Quote(quote("AAPL", dec!(1.00), 200))), 0);

        assert_eq!(board.quote("AAPL").unwrap().price, dec!(229.00));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_board_folds_ticker_sweeps() {
        let mut board = TickerBoard::new();
        let sweep = FeedEvent::Tickers {
            data: vec![
                quote("TSLA", dec!(242.84), 100),
                quote("AAPL", dec!(228.52), 100),
            ],
            timestamp_ms: 100,
        };
        assert_eq!(board.apply(&sweep), 2);

        // Second sweep with one stale entry
        let sweep = FeedEvent::Tickers {
            data: vec![
                quote("TSLA", dec!(243.00), 200),
                quote("AAPL", dec!(0.01), 100),
            ],
            timestamp_ms: 200,
        };
        assert_eq!(board.apply(&sweep), 1);

        let rows = board.rows();
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].price, dec!(228.52));
        assert_eq!(rows[1].symbol, "TSLA");
        assert_eq!(rows[1].price, dec!(243.00));
    }

    #[test]
    fn test_board_ignores_depth_frames() {
        let mut board = TickerBoard::new();
        let book = OrderBookSnapshot {
            symbol: "AAPL".to_string(),
            bids: vec![],
            asks: vec![],
            timestamp_ms: 100,
        };
        assert_eq!(board.apply(&FeedEvent::OrderBook(book)), 0);
        assert!(board.is_empty());
    }
}
