//! Pricing an account into a portfolio snapshot.
//!
//! Long value adds to equity, short value subtracts as an absolute, and
//! maintenance is a flat fraction of gross short value. The caller
//! supplies prices; a position with no live price is carried at its
//! entry and contributes no unrealized move.

use paperdesk_core::{Market, MarginStatus, PortfolioSnapshot, MAINTENANCE_RATE};
use rust_decimal::Decimal;

use crate::store::Account;

/// Price the account and derive equity, maintenance and margin state.
pub fn build_snapshot<F>(account: &Account, price_for: F) -> PortfolioSnapshot
where
    F: Fn(&str, Market) -> Option<Decimal>,
{
    let mut total_long = Decimal::ZERO;
    let mut total_short = Decimal::ZERO;
    let mut positions = Vec::new();

    for pos in account.positions() {
        let price = price_for(&pos.symbol, pos.market).unwrap_or(pos.avg_price);
        let value = pos.market_value(price);
        if pos.shares >= Decimal::ZERO {
            total_long += value;
        } else {
            total_short += -value;
        }
        positions.push(pos.enriched(price));
    }

    let cash = account.cash_balance();
    let equity = cash + total_long - total_short;
    let maintenance_required = MarginStatus::maintenance_for(total_short);
    let status = MarginStatus::evaluate(equity, maintenance_required);

    PortfolioSnapshot {
        cash_balance: cash,
        equity,
        maintenance_required,
        maintenance_rate: MAINTENANCE_RATE,
        margin_headroom: status.margin_headroom,
        in_margin_call: status.in_margin_call,
        positions,
    }
}
