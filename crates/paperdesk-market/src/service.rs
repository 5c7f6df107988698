//! Market data service: cache, upstream provider, synthetic fallback.

use std::sync::Arc;
use std::time::Duration;

use paperdesk_core::{Bar, BarRange, Market, OrderBookSnapshot, Quote};
use paperdesk_telemetry::Metrics;
use tracing::warn;

use crate::cache::QuoteCache;
use crate::error::{MarketError, MarketResult};
use crate::provider::QuoteProvider;
use crate::synthetic::SyntheticEngine;

/// Composes the quote path: cache hit within TTL, else upstream fetch,
/// else the synthetic engine. Callers choose between the infallible
/// path (`get_quote`) and the strict path that surfaces provider
/// failures (`get_quote_strict`).
pub struct MarketDataService {
    cache: QuoteCache,
    provider: Option<Arc<dyn QuoteProvider>>,
    synthetic: SyntheticEngine,
}

impl MarketDataService {
    pub fn new(provider: Option<Arc<dyn QuoteProvider>>, ttl: Duration) -> Self {
        Self {
            cache: QuoteCache::new(ttl),
            provider,
            synthetic: SyntheticEngine::new(),
        }
    }

    /// Service without an upstream provider; everything is synthetic.
    pub fn synthetic_only(ttl: Duration) -> Self {
        Self::new(None, ttl)
    }

    /// Quote for a symbol; never fails. Upstream failures degrade to the
    /// synthetic walk, tagged by `source`.
    pub async fn get_quote(&self, symbol: &str, market: Market) -> Quote {
        if let Some(hit) = self.cache.get(symbol, market) {
            Metrics::quote_served("cache");
            return hit;
        }
        if let Some(provider) = &self.provider {
            match provider.fetch_quote(symbol, market).await {
                Ok(quote) => {
                    self.cache.put(quote.clone());
                    Metrics::quote_served("upstream");
                    return quote;
                }
                Err(e) => {
                    warn!(symbol, market = %market, error = %e, "Upstream quote failed, serving synthetic");
                }
            }
        }
        Metrics::quote_served("synthetic");
        self.synthetic.next_quote(symbol, market)
    }

    /// Quote for a symbol without the synthetic fallback. Used where
    /// per-symbol failures must be reported rather than papered over.
    pub async fn get_quote_strict(&self, symbol: &str, market: Market) -> MarketResult<Quote> {
        if let Some(hit) = self.cache.get(symbol, market) {
            Metrics::quote_served("cache");
            return Ok(hit);
        }
        let provider = self.provider.as_ref().ok_or_else(|| {
            MarketError::ProviderUnavailable("no upstream provider configured".to_string())
        })?;
        let quote = provider.fetch_quote(symbol, market).await?;
        self.cache.put(quote.clone());
        Metrics::quote_served("upstream");
        Ok(quote)
    }

    /// Historical bars, upstream only.
    pub async fn get_bars(
        &self,
        symbol: &str,
        market: Market,
        range: BarRange,
    ) -> MarketResult<Vec<Bar>> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            MarketError::ProviderUnavailable("no upstream provider configured".to_string())
        })?;
        provider.fetch_bars(symbol, market, range).await
    }

    /// Synthetic depth snapshot for a symbol.
    pub fn order_book(&self, symbol: &str) -> OrderBookSnapshot {
        self.synthetic.order_book(symbol)
    }

    /// One walked quote per demo-universe symbol, in tape order.
    pub fn tape_quotes(&self) -> Vec<Quote> {
        SyntheticEngine::universe_symbols()
            .into_iter()
            .map(|symbol| self.synthetic.next_quote(symbol, Market::Us))
            .collect()
    }
}
