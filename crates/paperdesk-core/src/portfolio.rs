//! Portfolio positions and account snapshots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::margin::MarginStatus;
use crate::market::Market;

/// Open position in one instrument.
///
/// Shares are signed: positive for long exposure, negative for short.
/// Pricing fields are filled in when a snapshot is enriched with live
/// quotes and absent otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub market: Market,
    pub shares: Decimal,
    pub avg_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrow_rate_annual: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<Decimal>,
}

impl Position {
    pub fn new(symbol: impl Into<String>, market: Market, shares: Decimal, avg_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            market,
            shares,
            avg_price,
            borrow_rate_annual: None,
            current_price: None,
            current_value: None,
            unrealized_pnl: None,
        }
    }

    pub fn is_long(&self) -> bool {
        self.shares > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.shares < Decimal::ZERO
    }

    /// Signed market value at the given price. Negative for shorts.
    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.shares * price
    }

    /// Unrealized profit at the given price.
    ///
    /// The signed-share form covers both directions: a short gains as
    /// price drops below the average entry.
    pub fn unrealized_at(&self, price: Decimal) -> Decimal {
        (price - self.avg_price) * self.shares
    }

    /// Return a copy with pricing fields filled from a live price.
    pub fn enriched(&self, price: Decimal) -> Self {
        let mut out = self.clone();
        out.current_price = Some(price);
        out.current_value = Some(self.market_value(price));
        out.unrealized_pnl = Some(self.unrealized_at(price));
        out
    }
}

/// Account snapshot with margin figures and open positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash_balance: Decimal,
    pub equity: Decimal,
    pub maintenance_required: Decimal,
    pub maintenance_rate: Decimal,
    pub margin_headroom: Decimal,
    pub in_margin_call: bool,
    pub positions: Vec<Position>,
}

impl PortfolioSnapshot {
    /// Margin evaluation for this snapshot.
    pub fn margin_status(&self) -> MarginStatus {
        MarginStatus::evaluate(self.equity, self.maintenance_required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_long_unrealized() {
        let pos = Position::new("AAPL", Market::Us, dec!(10), dec!(220));
        assert!(pos.is_long());
        assert_eq!(pos.unrealized_at(dec!(228.52)), dec!(85.20));
        assert_eq!(pos.market_value(dec!(228.52)), dec!(2285.20));
    }

    #[test]
    fn test_short_gains_on_decline() {
        let pos = Position::new("TSLA", Market::Us, dec!(-20), dec!(250));
        assert!(pos.is_short());
        assert_eq!(pos.unrealized_at(dec!(242.84)), dec!(143.20));
        assert_eq!(pos.market_value(dec!(242.84)), dec!(-4856.80));
    }

    #[test]
    fn test_short_loses_on_rally() {
        let pos = Position::new("TSLA", Market::Us, dec!(-20), dec!(250));
        assert_eq!(pos.unrealized_at(dec!(260)), dec!(-200));
    }

    #[test]
    fn test_enriched_fills_pricing() {
        let pos = Position::new("MSFT", Market::Us, dec!(5), dec!(400));
        let live = pos.enriched(dec!(415.26));
        assert_eq!(live.current_price, Some(dec!(415.26)));
        assert_eq!(live.current_value, Some(dec!(2076.30)));
        assert_eq!(live.unrealized_pnl, Some(dec!(76.30)));
        // Source position is untouched
        assert!(pos.current_price.is_none());
    }

    #[test]
    fn test_snapshot_margin_status() {
        let snap = PortfolioSnapshot {
            cash_balance: dec!(100000),
            equity: dec!(112450),
            maintenance_required: dec!(28800),
            maintenance_rate: dec!(0.3),
            margin_headroom: dec!(83650),
            in_margin_call: false,
            positions: vec![],
        };
        let status = snap.margin_status();
        assert_eq!(status.margin_headroom, dec!(83650));
        assert!(!status.in_margin_call);
    }
}
