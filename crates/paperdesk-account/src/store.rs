//! In-memory account store.
//!
//! One account per username, created on first touch with the standard
//! starting cash. `DashMap` gives per-entry locking: a trade mutates its
//! account atomically without blocking the rest of the store.

use std::collections::HashMap;

use dashmap::DashMap;
use paperdesk_core::{Market, PortfolioSnapshot, Position, TransactionRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{TradeError, TradeResult};
use crate::shortable::daily_interest;
use crate::snapshot::build_snapshot;

/// Cash every new account starts with.
pub const STARTING_CASH: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// A single paper account: cash, open positions and the trade log.
#[derive(Debug, Clone)]
pub struct Account {
    username: String,
    cash_balance: Decimal,
    positions: HashMap<(String, Market), Position>,
    transactions: Vec<TransactionRecord>,
}

impl Account {
    pub(crate) fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            cash_balance: STARTING_CASH,
            positions: HashMap::new(),
            transactions: Vec::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    pub(crate) fn adjust_cash(&mut self, delta: Decimal) {
        self.cash_balance += delta;
    }

    pub fn position(&self, symbol: &str, market: Market) -> Option<&Position> {
        self.positions.get(&(symbol.to_string(), market))
    }

    /// Open positions in symbol order.
    pub fn positions(&self) -> Vec<Position> {
        let mut out: Vec<Position> = self.positions.values().cloned().collect();
        out.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| a.market.as_str().cmp(b.market.as_str()))
        });
        out
    }

    /// Apply a signed fill to the position book.
    ///
    /// Adding to a long weights the average entry by shares. Any other
    /// fill adds the signed quantity directly; crossing through zero
    /// starts a new lot at the fill price, and a position left at
    /// exactly zero shares is removed.
    pub(crate) fn upsert_position(
        &mut self,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
        borrow_rate: Option<Decimal>,
    ) {
        let key = (symbol.to_string(), market);
        let updated = match self.positions.get(&key) {
            None => {
                let mut pos = Position::new(symbol, market, qty, price);
                pos.borrow_rate_annual = borrow_rate;
                pos
            }
            Some(existing) => {
                let mut pos = existing.clone();
                if qty > Decimal::ZERO && pos.shares >= Decimal::ZERO {
                    let new_shares = pos.shares + qty;
                    pos.avg_price = (pos.avg_price * pos.shares + price * qty) / new_shares;
                    pos.shares = new_shares;
                } else {
                    let prior = pos.shares;
                    pos.shares += qty;
                    if !pos.shares.is_zero()
                        && (prior > Decimal::ZERO) != (pos.shares > Decimal::ZERO)
                    {
                        pos.avg_price = price;
                    }
                }
                if borrow_rate.is_some() {
                    pos.borrow_rate_annual = borrow_rate;
                }
                pos
            }
        };
        if updated.shares.is_zero() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, updated);
        }
    }

    pub(crate) fn record_fill(&mut self, record: TransactionRecord) {
        self.transactions.push(record);
    }

    /// Trade log page, most recent first.
    pub fn transactions(&self, limit: usize, offset: usize) -> Vec<TransactionRecord> {
        self.transactions
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// One day of borrow interest charged against a short position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestCharge {
    pub username: String,
    pub symbol: String,
    pub interest: Decimal,
}

/// Concurrent account registry keyed by username.
pub struct AccountStore {
    accounts: DashMap<String, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Create the account on first touch; later calls are no-ops.
    pub fn open(&self, username: &str) {
        self.accounts.entry(username.to_string()).or_insert_with(|| {
            info!("Opened paper account for {}", username);
            Account::new(username)
        });
    }

    pub fn contains(&self, username: &str) -> bool {
        self.accounts.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Run `f` against the account under its entry lock.
    pub fn with_account<R>(&self, username: &str, f: impl FnOnce(&Account) -> R) -> TradeResult<R> {
        match self.accounts.get(username) {
            Some(account) => Ok(f(account.value())),
            None => Err(TradeError::UnknownAccount),
        }
    }

    /// Mutate the account under its entry lock. The closure carries the
    /// trade rules, so its rejection propagates as-is.
    pub fn with_account_mut<R>(
        &self,
        username: &str,
        f: impl FnOnce(&mut Account) -> TradeResult<R>,
    ) -> TradeResult<R> {
        match self.accounts.get_mut(username) {
            Some(mut account) => f(account.value_mut()),
            None => Err(TradeError::UnknownAccount),
        }
    }

    pub fn cash_balance(&self, username: &str) -> TradeResult<Decimal> {
        self.with_account(username, |account| account.cash_balance())
    }

    pub fn positions(&self, username: &str) -> TradeResult<Vec<Position>> {
        self.with_account(username, |account| account.positions())
    }

    pub fn transactions(
        &self,
        username: &str,
        limit: usize,
        offset: usize,
    ) -> TradeResult<Vec<TransactionRecord>> {
        self.with_account(username, |account| account.transactions(limit, offset))
    }

    /// Live-priced snapshot for one account.
    pub fn snapshot<F>(&self, username: &str, price_for: F) -> TradeResult<PortfolioSnapshot>
    where
        F: Fn(&str, Market) -> Option<Decimal>,
    {
        self.with_account(username, |account| build_snapshot(account, price_for))
    }

    /// Number of accounts whose equity sits below maintenance at the
    /// given prices.
    pub fn margin_call_count<F>(&self, price_for: F) -> usize
    where
        F: Fn(&str, Market) -> Option<Decimal>,
    {
        self.accounts
            .iter()
            .filter(|entry| build_snapshot(entry.value(), &price_for).in_margin_call)
            .count()
    }

    /// Charge one day of borrow interest on every short position.
    ///
    /// Positions without a live price or a recorded borrow rate are
    /// skipped rather than charged at a guessed notional.
    pub fn apply_daily_interest<F>(&self, price_for: F) -> Vec<InterestCharge>
    where
        F: Fn(&str, Market) -> Option<Decimal>,
    {
        let mut charges = Vec::new();
        for mut entry in self.accounts.iter_mut() {
            let account = entry.value_mut();
            let shorts: Vec<(String, Decimal, Decimal)> = account
                .positions
                .values()
                .filter(|pos| pos.is_short())
                .filter_map(|pos| {
                    let rate = pos.borrow_rate_annual?;
                    let price = price_for(&pos.symbol, pos.market)?;
                    Some((pos.symbol.clone(), -pos.shares * price, rate))
                })
                .collect();
            for (symbol, notional, rate) in shorts {
                let interest = daily_interest(notional, rate);
                account.cash_balance -= interest;
                charges.push(InterestCharge {
                    username: account.username.clone(),
                    symbol,
                    interest,
                });
            }
        }
        if !charges.is_empty() {
            debug!("Charged borrow interest on {} short positions", charges.len());
        }
        charges
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_open_is_idempotent_and_seeds_cash() {
        let store = AccountStore::new();
        store.open("demo");
        store.open("demo");
        assert_eq!(store.len(), 1);
        assert_eq!(store.cash_balance("demo").unwrap(), dec!(100000));
    }

    #[test]
    fn test_unknown_account_errors() {
        let store = AccountStore::new();
        assert_eq!(
            store.cash_balance("ghost").unwrap_err(),
            TradeError::UnknownAccount
        );
        assert_eq!(
            store.positions("ghost").unwrap_err(),
            TradeError::UnknownAccount
        );
    }

    #[test]
    fn test_buying_into_long_weights_average() {
        let mut account = Account::new("demo");
        account.upsert_position("AAPL", Market::Us, dec!(10), dec!(100), None);
        account.upsert_position("AAPL", Market::Us, dec!(10), dec!(110), None);
        let pos = account.position("AAPL", Market::Us).unwrap();
        assert_eq!(pos.shares, dec!(20));
        assert_eq!(pos.avg_price, dec!(105));
    }

    #[test]
    fn test_partial_sell_keeps_entry_price() {
        let mut account = Account::new("demo");
        account.upsert_position("AAPL", Market::Us, dec!(10), dec!(100), None);
        account.upsert_position("AAPL", Market::Us, dec!(-4), dec!(150), None);
        let pos = account.position("AAPL", Market::Us).unwrap();
        assert_eq!(pos.shares, dec!(6));
        assert_eq!(pos.avg_price, dec!(100));
    }

    #[test]
    fn test_closing_fill_removes_position() {
        let mut account = Account::new("demo");
        account.upsert_position("AAPL", Market::Us, dec!(10), dec!(100), None);
        account.upsert_position("AAPL", Market::Us, dec!(-10), dec!(120), None);
        assert!(account.position("AAPL", Market::Us).is_none());
        assert!(account.positions().is_empty());
    }

    #[test]
    fn test_crossing_zero_resets_entry_to_fill_price() {
        let mut account = Account::new("demo");
        account.upsert_position("AAPL", Market::Us, dec!(10), dec!(100), None);
        account.upsert_position("AAPL", Market::Us, dec!(-15), dec!(120), None);
        let pos = account.position("AAPL", Market::Us).unwrap();
        assert_eq!(pos.shares, dec!(-5));
        assert_eq!(pos.avg_price, dec!(120));
    }

    #[test]
    fn test_partial_cover_keeps_short_entry() {
        let mut account = Account::new("demo");
        account.upsert_position("TSLA", Market::Us, dec!(-10), dec!(200), Some(dec!(0.08)));
        account.upsert_position("TSLA", Market::Us, dec!(4), dec!(180), None);
        let pos = account.position("TSLA", Market::Us).unwrap();
        assert_eq!(pos.shares, dec!(-6));
        assert_eq!(pos.avg_price, dec!(200));
        assert_eq!(pos.borrow_rate_annual, Some(dec!(0.08)));
    }

    #[test]
    fn test_adding_to_short_keeps_entry() {
        let mut account = Account::new("demo");
        account.upsert_position("TSLA", Market::Us, dec!(-10), dec!(200), Some(dec!(0.08)));
        account.upsert_position("TSLA", Market::Us, dec!(-5), dec!(210), Some(dec!(0.08)));
        let pos = account.position("TSLA", Market::Us).unwrap();
        assert_eq!(pos.shares, dec!(-15));
        assert_eq!(pos.avg_price, dec!(200));
    }

    #[test]
    fn test_same_symbol_different_market_is_distinct() {
        let mut account = Account::new("demo");
        account.upsert_position("INFY", Market::Us, dec!(10), dec!(20), None);
        account.upsert_position("INFY", Market::In, dec!(5), dec!(1500), None);
        assert_eq!(account.positions().len(), 2);
        assert_eq!(
            account.position("INFY", Market::In).unwrap().shares,
            dec!(5)
        );
    }

    #[test]
    fn test_transactions_page_newest_first() {
        use paperdesk_core::{TradeKind, TransactionRecord};
        let mut account = Account::new("demo");
        for qty in [1, 2, 3] {
            account.record_fill(TransactionRecord::new(
                "AAPL",
                Market::Us,
                TradeKind::Buy,
                Decimal::from(qty),
                dec!(100),
            ));
        }
        let page = account.transactions(2, 0);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].quantity, dec!(3));
        assert_eq!(page[1].quantity, dec!(2));
        let tail = account.transactions(50, 2);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].quantity, dec!(1));
        assert_eq!(account.transaction_count(), 3);
    }

    #[test]
    fn test_margin_call_count_across_accounts() {
        let store = AccountStore::new();
        store.open("safe");
        store.open("busted");
        store
            .with_account_mut("busted", |account| {
                account.adjust_cash(dec!(-99000));
                account.upsert_position("MEME", Market::Us, dec!(-100), dec!(10), Some(dec!(0.1)));
                Ok(())
            })
            .unwrap();
        // MEME rallies to 40: equity 1000 - 4000 < maintenance 1200
        let count = store.margin_call_count(|symbol, _| {
            (symbol == "MEME").then_some(dec!(40))
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn test_apply_daily_interest_debits_shorts_only() {
        let store = AccountStore::new();
        store.open("demo");
        store
            .with_account_mut("demo", |account| {
                account.upsert_position("AAPL", Market::Us, dec!(10), dec!(100), None);
                account.upsert_position("TSLA", Market::Us, dec!(-10), dec!(200), Some(dec!(0.0365)));
                Ok(())
            })
            .unwrap();

        let charges = store.apply_daily_interest(|symbol, _| match symbol {
            "TSLA" => Some(dec!(200)),
            "AAPL" => Some(dec!(100)),
            _ => None,
        });
        // notional 2000 at 3.65%: 0.20 per day
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].symbol, "TSLA");
        assert_eq!(charges[0].interest, dec!(0.2));
        assert_eq!(store.cash_balance("demo").unwrap(), dec!(99999.8));
    }

    #[test]
    fn test_apply_daily_interest_skips_unpriced() {
        let store = AccountStore::new();
        store.open("demo");
        store
            .with_account_mut("demo", |account| {
                account.upsert_position("TSLA", Market::Us, dec!(-10), dec!(200), Some(dec!(0.1)));
                Ok(())
            })
            .unwrap();
        let charges = store.apply_daily_interest(|_, _| None);
        assert!(charges.is_empty());
        assert_eq!(store.cash_balance("demo").unwrap(), dec!(100000));
    }
}
