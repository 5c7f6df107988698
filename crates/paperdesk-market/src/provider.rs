//! Provider seam for quote and historical-bar sources.

use async_trait::async_trait;
use paperdesk_core::{Bar, BarRange, Market, Quote};

use crate::error::MarketResult;

/// A source of live quotes and historical bars.
///
/// Implementations absorb their own transport failures: anything that
/// goes wrong upstream surfaces as `MarketError::ProviderUnavailable`.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Short name for logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Fetch the current quote for a symbol.
    async fn fetch_quote(&self, symbol: &str, market: Market) -> MarketResult<Quote>;

    /// Fetch historical bars covering the given range.
    async fn fetch_bars(&self, symbol: &str, market: Market, range: BarRange)
        -> MarketResult<Vec<Bar>>;
}
