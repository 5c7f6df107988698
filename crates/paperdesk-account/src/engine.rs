//! Trade execution rules for buy, sell, short and cover.
//!
//! Prices are injected by the caller; the engine never fetches quotes.
//! An accepted fill debits or credits cash, upserts the position and
//! appends a transaction record, all under the account's entry lock.
//! Short proceeds are credited up front with a 1.5x initial margin
//! check; maintenance is enforced on the equity side by the snapshot.

use std::sync::Arc;

use paperdesk_core::{Market, TradeKind, TransactionRecord};
use paperdesk_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{TradeError, TradeResult};
use crate::shortable::{initial_short_margin_required, ShortableDirectory};
use crate::store::AccountStore;

/// Successful fill summary returned to the API caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReceipt {
    pub status: String,
    pub symbol: String,
    pub qty: Decimal,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrow_rate_annual: Option<Decimal>,
}

impl TradeReceipt {
    fn filled(symbol: &str, qty: Decimal, price: Decimal) -> Self {
        Self {
            status: "ok".to_string(),
            symbol: symbol.to_string(),
            qty,
            price,
            borrow_rate_annual: None,
        }
    }
}

/// Applies the paper-trade rule set to accounts in the store.
pub struct TradeEngine {
    store: Arc<AccountStore>,
    shortable: Arc<ShortableDirectory>,
}

impl TradeEngine {
    pub fn new(store: Arc<AccountStore>, shortable: Arc<ShortableDirectory>) -> Self {
        Self { store, shortable }
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn shortable(&self) -> &ShortableDirectory {
        &self.shortable
    }

    pub fn buy(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        self.execute(username, symbol, market, TradeKind::Buy, qty, price)
    }

    pub fn sell(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        self.execute(username, symbol, market, TradeKind::Sell, qty, price)
    }

    pub fn short(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        self.execute(username, symbol, market, TradeKind::Short, qty, price)
    }

    pub fn cover(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        self.execute(username, symbol, market, TradeKind::Cover, qty, price)
    }

    fn execute(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        kind: TradeKind,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        let result = self.apply(username, symbol, market, kind, qty, price);
        match &result {
            Ok(receipt) => {
                Metrics::trade_executed(kind_label(kind));
                info!(
                    "Filled {} {} {} @ {} for {}",
                    kind, receipt.qty, receipt.symbol, receipt.price, username
                );
            }
            Err(err) => {
                Metrics::trade_rejected(err.reason());
                debug!("Rejected {} {} {} for {}: {}", kind, qty, symbol, username, err);
            }
        }
        result
    }

    fn apply(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        kind: TradeKind,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        if qty <= Decimal::ZERO {
            return Err(TradeError::InvalidQuantity);
        }
        match kind {
            TradeKind::Buy => self.apply_buy(username, symbol, market, qty, price),
            TradeKind::Sell => self.apply_sell(username, symbol, market, qty, price),
            TradeKind::Short => self.apply_short(username, symbol, market, qty, price),
            TradeKind::Cover => self.apply_cover(username, symbol, market, qty, price),
        }
    }

    fn apply_buy(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        let total = qty * price;
        self.store.with_account_mut(username, |account| {
            if account.cash_balance() < total {
                return Err(TradeError::InsufficientCash);
            }
            account.adjust_cash(-total);
            account.upsert_position(symbol, market, qty, price, None);
            account.record_fill(TransactionRecord::new(
                symbol,
                market,
                TradeKind::Buy,
                qty,
                price,
            ));
            Ok(TradeReceipt::filled(symbol, qty, price))
        })
    }

    fn apply_sell(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        let total = qty * price;
        self.store.with_account_mut(username, |account| {
            let shares = match account.position(symbol, market) {
                Some(pos) => pos.shares,
                None => Decimal::ZERO,
            };
            if shares <= Decimal::ZERO {
                return Err(TradeError::NoLongPosition);
            }
            if shares < qty {
                return Err(TradeError::NotEnoughShares);
            }
            account.adjust_cash(total);
            account.upsert_position(symbol, market, -qty, price, None);
            account.record_fill(TransactionRecord::new(
                symbol,
                market,
                TradeKind::Sell,
                qty,
                price,
            ));
            Ok(TradeReceipt::filled(symbol, qty, price))
        })
    }

    fn apply_short(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        let rate = match self.shortable.borrow_rate(symbol, market) {
            Some(rate) => rate,
            None => return Err(TradeError::NotShortable),
        };
        let notional = qty * price;
        let initial_margin = initial_short_margin_required(notional);
        self.store.with_account_mut(username, |account| {
            if account.cash_balance() < initial_margin {
                return Err(TradeError::InsufficientInitialMargin);
            }
            account.adjust_cash(notional);
            account.upsert_position(symbol, market, -qty, price, Some(rate));
            account.record_fill(TransactionRecord::new(
                symbol,
                market,
                TradeKind::Short,
                qty,
                price,
            ));
            let mut receipt = TradeReceipt::filled(symbol, qty, price);
            receipt.borrow_rate_annual = Some(rate);
            Ok(receipt)
        })
    }

    fn apply_cover(
        &self,
        username: &str,
        symbol: &str,
        market: Market,
        qty: Decimal,
        price: Decimal,
    ) -> TradeResult<TradeReceipt> {
        let notional = qty * price;
        self.store.with_account_mut(username, |account| {
            let shares = match account.position(symbol, market) {
                Some(pos) => pos.shares,
                None => Decimal::ZERO,
            };
            if shares >= Decimal::ZERO {
                return Err(TradeError::NoShortPosition);
            }
            if -shares < qty {
                return Err(TradeError::CoverExceedsShort);
            }
            if account.cash_balance() < notional {
                return Err(TradeError::InsufficientCashToCover);
            }
            account.adjust_cash(-notional);
            account.upsert_position(symbol, market, qty, price, None);
            account.record_fill(TransactionRecord::new(
                symbol,
                market,
                TradeKind::Cover,
                qty,
                price,
            ));
            Ok(TradeReceipt::filled(symbol, qty, price))
        })
    }
}

fn kind_label(kind: TradeKind) -> &'static str {
    match kind {
        TradeKind::Buy => "buy",
        TradeKind::Sell => "sell",
        TradeKind::Short => "short",
        TradeKind::Cover => "cover",
    }
}
