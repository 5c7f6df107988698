//! Account engine integration tests.
//!
//! Drives full trade journeys through the public API:
//! - Long round trip with live-priced snapshots
//! - Short round trip with proceeds, margin and borrow rate
//! - Margin call detection across the store
//! - Daily borrow interest charges

use std::sync::Arc;

use paperdesk_account::{
    AccountStore, ShortableDirectory, ShortableEntry, TradeEngine,
};
use paperdesk_core::{Market, MarginZone, TradeKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn shortable() -> ShortableDirectory {
    ShortableDirectory::new(vec![ShortableEntry {
        symbol: "TSLA".to_string(),
        market: Market::Us,
        borrow_rate_annual: dec!(0.0365),
        available: true,
    }])
}

fn engine() -> TradeEngine {
    let store = Arc::new(AccountStore::new());
    store.open("demo");
    TradeEngine::new(store, Arc::new(shortable()))
}

fn priced(aapl: Decimal, tsla: Decimal) -> impl Fn(&str, Market) -> Option<Decimal> {
    move |symbol, _| match symbol {
        "AAPL" => Some(aapl),
        "TSLA" => Some(tsla),
        _ => None,
    }
}

#[test]
fn test_long_round_trip_with_snapshots() {
    let engine = engine();
    let store = engine.store();

    engine.buy("demo", "AAPL", Market::Us, dec!(10), dec!(220)).unwrap();
    assert_eq!(store.cash_balance("demo").unwrap(), dec!(97800));

    let snap = store
        .snapshot("demo", priced(dec!(228.52), dec!(242.84)))
        .unwrap();
    assert_eq!(snap.equity, dec!(100085.20));
    assert_eq!(snap.maintenance_required, Decimal::ZERO);
    assert!(!snap.in_margin_call);
    assert_eq!(snap.positions[0].unrealized_pnl, Some(dec!(85.20)));

    engine.sell("demo", "AAPL", Market::Us, dec!(10), dec!(228.52)).unwrap();
    assert_eq!(store.cash_balance("demo").unwrap(), dec!(100085.20));
    assert!(store.positions("demo").unwrap().is_empty());
}

#[test]
fn test_short_round_trip_with_margin() {
    let engine = engine();
    let store = engine.store();

    let receipt = engine
        .short("demo", "TSLA", Market::Us, dec!(20), dec!(250))
        .unwrap();
    assert_eq!(receipt.borrow_rate_annual, Some(dec!(0.0365)));
    assert_eq!(store.cash_balance("demo").unwrap(), dec!(105000));

    let snap = store
        .snapshot("demo", priced(dec!(228.52), dec!(242.84)))
        .unwrap();
    // 105000 + 0 long - 4856.80 short
    assert_eq!(snap.equity, dec!(100143.20));
    assert_eq!(snap.maintenance_required, dec!(1457.040));
    assert_eq!(snap.margin_headroom, snap.equity - snap.maintenance_required);
    assert!(!snap.in_margin_call);

    engine.cover("demo", "TSLA", Market::Us, dec!(20), dec!(242.84)).unwrap();
    assert_eq!(store.cash_balance("demo").unwrap(), dec!(100143.20));
    assert!(store.positions("demo").unwrap().is_empty());
}

#[test]
fn test_trade_log_covers_every_fill() {
    let engine = engine();
    engine.buy("demo", "AAPL", Market::Us, dec!(10), dec!(100)).unwrap();
    engine.sell("demo", "AAPL", Market::Us, dec!(10), dec!(110)).unwrap();
    engine.short("demo", "TSLA", Market::Us, dec!(5), dec!(200)).unwrap();
    engine.cover("demo", "TSLA", Market::Us, dec!(5), dec!(190)).unwrap();

    let log = engine.store().transactions("demo", 50, 0).unwrap();
    assert_eq!(log.len(), 4);
    let kinds: Vec<TradeKind> = log.iter().map(|tx| tx.kind).collect();
    assert_eq!(
        kinds,
        vec![TradeKind::Cover, TradeKind::Short, TradeKind::Sell, TradeKind::Buy]
    );
    // Paging walks backwards through time
    let page = engine.store().transactions("demo", 2, 2).unwrap();
    assert_eq!(page[0].kind, TradeKind::Sell);
    assert_eq!(page[1].kind, TradeKind::Buy);
}

#[test]
fn test_margin_call_journey() {
    let engine = engine();
    let store = engine.store();

    engine.short("demo", "TSLA", Market::Us, dec!(100), dec!(250)).unwrap();
    assert_eq!(store.cash_balance("demo").unwrap(), dec!(125000));

    // Still safe near the entry price
    let safe = store.snapshot("demo", priced(dec!(0), dec!(255))).unwrap();
    assert!(!safe.in_margin_call);
    assert_eq!(store.margin_call_count(priced(dec!(0), dec!(255))), 0);

    // A rally to 2000 buries the account: equity 125000 - 200000
    let busted = store.snapshot("demo", priced(dec!(0), dec!(2000))).unwrap();
    assert_eq!(busted.equity, dec!(-75000));
    assert_eq!(busted.maintenance_required, dec!(60000.0));
    assert!(busted.in_margin_call);
    assert_eq!(busted.margin_status().zone, MarginZone::MarginCall);
    assert_eq!(store.margin_call_count(priced(dec!(0), dec!(2000))), 1);
}

#[test]
fn test_daily_interest_charged_through_engine_state() {
    let engine = engine();
    let store = engine.store();

    engine.short("demo", "TSLA", Market::Us, dec!(10), dec!(200)).unwrap();
    assert_eq!(store.cash_balance("demo").unwrap(), dec!(102000));

    // notional 2000 at 3.65% annual: 0.20 per day
    let charges = store.apply_daily_interest(priced(dec!(0), dec!(200)));
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].username, "demo");
    assert_eq!(charges[0].symbol, "TSLA");
    assert_eq!(charges[0].interest, dec!(0.2));
    assert_eq!(store.cash_balance("demo").unwrap(), dec!(101999.8));
}

#[test]
fn test_accounts_are_isolated() {
    let engine = engine();
    let store = engine.store();
    store.open("other");

    engine.buy("demo", "AAPL", Market::Us, dec!(10), dec!(100)).unwrap();
    assert_eq!(store.cash_balance("other").unwrap(), dec!(100000));
    assert!(store.positions("other").unwrap().is_empty());
    assert!(store.transactions("other", 50, 0).unwrap().is_empty());
}
