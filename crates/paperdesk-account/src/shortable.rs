//! Shortable universe with annualized borrow rates.
//!
//! The directory is built once at startup and read at trade time: a
//! symbol may be shorted only while it is listed here and flagged
//! available. Generated entries get a uniform borrow rate inside the
//! configured band, rounded to four decimals.

use std::collections::HashMap;

use paperdesk_core::Market;
use rand::seq::IndexedRandom;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lower bound of the generated annual borrow-rate band.
pub const MIN_BORROW_RATE: f64 = 0.02;

/// Upper bound of the generated annual borrow-rate band.
pub const MAX_BORROW_RATE: f64 = 0.18;

/// Initial margin multiple on short notional.
pub const INITIAL_MARGIN_MULTIPLE: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Day-count basis for borrow interest.
const DAYS_PER_YEAR: Decimal = Decimal::from_parts(365, 0, 0, false, 0);

/// One shortable instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortableEntry {
    pub symbol: String,
    pub market: Market,
    pub borrow_rate_annual: Decimal,
    pub available: bool,
}

/// Lookup table for what may be sold short and at what borrow cost.
pub struct ShortableDirectory {
    entries: HashMap<(String, Market), ShortableEntry>,
}

impl ShortableDirectory {
    pub fn new(entries: Vec<ShortableEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| ((entry.symbol.clone(), entry.market), entry))
            .collect();
        Self { entries }
    }

    /// Randomly select up to `count` symbols from the universe and assign
    /// each a borrow rate within the band.
    pub fn generate(universe: &[(&str, Market)], count: usize) -> Self {
        let mut rng = rand::rng();
        let picked: Vec<&(&str, Market)> = universe
            .choose_multiple(&mut rng, count.min(universe.len()))
            .collect();
        let entries = picked
            .into_iter()
            .map(|(symbol, market)| ShortableEntry {
                symbol: (*symbol).to_string(),
                market: *market,
                borrow_rate_annual: random_borrow_rate(&mut rng),
                available: true,
            })
            .collect();
        Self::new(entries)
    }

    /// Borrow rate for a symbol, `None` when absent or unavailable.
    pub fn borrow_rate(&self, symbol: &str, market: Market) -> Option<Decimal> {
        self.entries
            .get(&(symbol.to_string(), market))
            .filter(|entry| entry.available)
            .map(|entry| entry.borrow_rate_annual)
    }

    /// Entries, optionally filtered by market, in symbol order.
    pub fn list(&self, market: Option<Market>) -> Vec<ShortableEntry> {
        let mut out: Vec<ShortableEntry> = self
            .entries
            .values()
            .filter(|entry| market.map_or(true, |m| entry.market == m))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn random_borrow_rate(rng: &mut impl Rng) -> Decimal {
    let rate: f64 = rng.random_range(MIN_BORROW_RATE..=MAX_BORROW_RATE);
    Decimal::from_f64_retain(rate)
        .unwrap_or(Decimal::ZERO)
        .round_dp(4)
}

/// Cash required up front to open a short of the given notional.
pub fn initial_short_margin_required(notional: Decimal) -> Decimal {
    notional * INITIAL_MARGIN_MULTIPLE
}

/// One day of borrow interest on a short notional.
pub fn daily_interest(notional: Decimal, annual_rate: Decimal) -> Decimal {
    notional * annual_rate / DAYS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(symbol: &str, market: Market, rate: Decimal, available: bool) -> ShortableEntry {
        ShortableEntry {
            symbol: symbol.to_string(),
            market,
            borrow_rate_annual: rate,
            available,
        }
    }

    #[test]
    fn test_generated_rates_stay_in_band() {
        let universe = [
            ("SPY", Market::Us),
            ("QQQ", Market::Us),
            ("AAPL", Market::Us),
            ("TSLA", Market::Us),
            ("RELIANCE", Market::In),
            ("INFY", Market::In),
        ];
        let directory = ShortableDirectory::generate(&universe, 4);
        assert_eq!(directory.len(), 4);
        for entry in directory.list(None) {
            assert!(entry.available);
            assert!(entry.borrow_rate_annual >= dec!(0.02));
            assert!(entry.borrow_rate_annual <= dec!(0.18));
            assert!(entry.borrow_rate_annual.scale() <= 4);
        }
    }

    #[test]
    fn test_generate_caps_at_universe_size() {
        let universe = [("SPY", Market::Us), ("QQQ", Market::Us)];
        let directory = ShortableDirectory::generate(&universe, 100);
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn test_borrow_rate_checks_market_and_availability() {
        let directory = ShortableDirectory::new(vec![
            entry("TSLA", Market::Us, dec!(0.08), true),
            entry("NVDA", Market::Us, dec!(0.12), false),
        ]);
        assert_eq!(directory.borrow_rate("TSLA", Market::Us), Some(dec!(0.08)));
        // Wrong market
        assert_eq!(directory.borrow_rate("TSLA", Market::In), None);
        // Listed but unavailable
        assert_eq!(directory.borrow_rate("NVDA", Market::Us), None);
        assert_eq!(directory.borrow_rate("AAPL", Market::Us), None);
    }

    #[test]
    fn test_list_filters_by_market_in_symbol_order() {
        let directory = ShortableDirectory::new(vec![
            entry("TSLA", Market::Us, dec!(0.08), true),
            entry("AAPL", Market::Us, dec!(0.05), true),
            entry("RELIANCE", Market::In, dec!(0.10), true),
        ]);
        let us: Vec<String> = directory
            .list(Some(Market::Us))
            .into_iter()
            .map(|e| e.symbol)
            .collect();
        assert_eq!(us, vec!["AAPL", "TSLA"]);
        assert_eq!(directory.list(None).len(), 3);
    }

    #[test]
    fn test_initial_margin_is_one_and_a_half_notional() {
        assert_eq!(INITIAL_MARGIN_MULTIPLE, dec!(1.5));
        assert_eq!(initial_short_margin_required(dec!(2000)), dec!(3000));
    }

    #[test]
    fn test_daily_interest_arithmetic() {
        // 2000 * 0.0365 / 365 = 0.20 per day
        assert_eq!(daily_interest(dec!(2000), dec!(0.0365)), dec!(0.2));
    }
}
