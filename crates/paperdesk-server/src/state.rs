//! Shared application state wired into every route handler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use paperdesk_account::{AccountStore, ShortableDirectory, TradeEngine, TradeResult};
use paperdesk_core::{Market, PortfolioSnapshot, Position};
use paperdesk_market::{directory, MarketDataService, QuoteProvider, UpstreamProvider};
use paperdesk_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::{SessionRegistry, Tier, UserRegistry};
use crate::config::ServerConfig;
use crate::error::AppResult;

/// Everything the handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub market: Arc<MarketDataService>,
    pub store: Arc<AccountStore>,
    pub engine: Arc<TradeEngine>,
    pub users: Arc<UserRegistry>,
    pub sessions: Arc<SessionRegistry>,
    pub limiter: Arc<ConnectionLimiter>,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServerConfig) -> AppResult<Self> {
        let provider: Option<Arc<dyn QuoteProvider>> = if config.upstream_enabled() {
            let base = if config.upstream_base_url.is_empty() {
                paperdesk_market::DEFAULT_BASE_URL.to_string()
            } else {
                config.upstream_base_url.clone()
            };
            info!("Upstream quote provider enabled at {}", base);
            Some(Arc::new(UpstreamProvider::new(
                base,
                config.upstream_token.clone(),
            )?))
        } else {
            info!("No upstream token configured, serving synthetic quotes only");
            None
        };

        let market = Arc::new(MarketDataService::new(
            provider,
            Duration::from_secs(config.quote_ttl_secs),
        ));

        let universe: Vec<(&str, Market)> = directory::instruments(Market::Us)
            .iter()
            .map(|i| (i.symbol, Market::Us))
            .chain(
                directory::instruments(Market::In)
                    .iter()
                    .map(|i| (i.symbol, Market::In)),
            )
            .collect();
        let shortable = Arc::new(ShortableDirectory::generate(
            &universe,
            config.shortable_count,
        ));
        info!("Marked {} instruments shortable", shortable.len());

        let store = Arc::new(AccountStore::new());
        let engine = Arc::new(TradeEngine::new(Arc::clone(&store), Arc::clone(&shortable)));
        let users = Arc::new(UserRegistry::new());
        let sessions = Arc::new(SessionRegistry::new());
        let limiter = Arc::new(ConnectionLimiter::new(config.max_ws_connections));

        // Seeded demo login so the app works out of the box.
        if let Ok(demo) = users.register("demo", "demo@paperdesk.local", "demo123") {
            users.set_tier(demo.id, Tier::Intermediate);
            store.open(&demo.username);
            info!("Seeded demo account '{}'", demo.username);
        }

        Ok(Self {
            config: Arc::new(config),
            market,
            store,
            engine,
            users,
            sessions,
            limiter,
            shutdown: CancellationToken::new(),
        })
    }

    /// Fetches a live price for every position in the slice. The account
    /// store valuations are synchronous, so prices are resolved up front.
    pub async fn prices_for(&self, positions: &[Position]) -> HashMap<(String, Market), Decimal> {
        let mut prices = HashMap::new();
        for position in positions {
            let key = (position.symbol.clone(), position.market);
            if prices.contains_key(&key) {
                continue;
            }
            let quote = self.market.get_quote(&position.symbol, position.market).await;
            prices.insert(key, quote.price);
        }
        prices
    }

    pub async fn portfolio_snapshot(&self, username: &str) -> TradeResult<PortfolioSnapshot> {
        let positions = self.store.positions(username)?;
        let prices = self.prices_for(&positions).await;
        self.store.snapshot(username, |symbol, market| {
            prices.get(&(symbol.to_string(), market)).copied()
        })
    }

    /// Prices every open position across all accounts.
    pub async fn price_all(&self) -> HashMap<(String, Market), Decimal> {
        let mut all = Vec::new();
        for record in self.users.all() {
            if let Ok(mut positions) = self.store.positions(&record.username) {
                all.append(&mut positions);
            }
        }
        self.prices_for(&all).await
    }
}

/// Periodically republishes the margin-call gauge so it stays fresh even
/// when nobody is trading.
pub fn spawn_margin_sampler(state: AppState) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let prices = state.price_all().await;
                    let in_call = state.store.margin_call_count(|symbol, market| {
                        prices.get(&(symbol.to_string(), market)).copied()
                    });
                    Metrics::accounts_in_margin_call(in_call as i64);
                    debug!("Margin sampler: {} accounts in call", in_call);
                }
                _ = state.shutdown.cancelled() => break,
            }
        }
    });
}

/// Caps concurrent websocket subscribers and tracks a per-feed breakdown.
pub struct ConnectionLimiter {
    max: usize,
    active: AtomicUsize,
    quote: AtomicUsize,
    orderbook: AtomicUsize,
    tickers: AtomicUsize,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStats {
    pub active: usize,
    pub per_feed: PerFeedStats,
}

#[derive(Debug, Serialize)]
pub struct PerFeedStats {
    pub quote: usize,
    pub orderbook: usize,
    pub tickers: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            active: AtomicUsize::new(0),
            quote: AtomicUsize::new(0),
            orderbook: AtomicUsize::new(0),
            tickers: AtomicUsize::new(0),
        }
    }

    fn counter(&self, kind: &str) -> &AtomicUsize {
        match kind {
            "quote" => &self.quote,
            "orderbook" => &self.orderbook,
            _ => &self.tickers,
        }
    }

    /// Reserves a slot, or returns None when the server is at capacity.
    pub fn try_acquire(self: &Arc<Self>, kind: &'static str) -> Option<ConnectionGuard> {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.max {
                return None;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.counter(kind).fetch_add(1, Ordering::AcqRel);
        Metrics::ws_client_connected();
        Some(ConnectionGuard {
            limiter: Arc::clone(self),
            kind,
        })
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            active: self.active(),
            per_feed: PerFeedStats {
                quote: self.quote.load(Ordering::Acquire),
                orderbook: self.orderbook.load(Ordering::Acquire),
                tickers: self.tickers.load(Ordering::Acquire),
            },
        }
    }
}

/// Releases the slot when the subscriber task finishes.
pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
    kind: &'static str,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.active.fetch_sub(1, Ordering::AcqRel);
        self.limiter.counter(self.kind).fetch_sub(1, Ordering::AcqRel);
        Metrics::ws_client_disconnected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limiter(max: usize) -> Arc<ConnectionLimiter> {
        Arc::new(ConnectionLimiter::new(max))
    }

    #[test]
    fn limiter_caps_and_releases() {
        let limiter = limiter(2);
        let a = limiter.try_acquire("tickers").unwrap();
        let _b = limiter.try_acquire("tickers").unwrap();
        assert!(limiter.try_acquire("tickers").is_none());
        drop(a);
        assert_eq!(limiter.active(), 1);
        assert!(limiter.try_acquire("tickers").is_some());
    }

    #[test]
    fn limiter_tracks_per_feed_counts() {
        let limiter = limiter(8);
        let _q = limiter.try_acquire("quote").unwrap();
        let _o1 = limiter.try_acquire("orderbook").unwrap();
        let _o2 = limiter.try_acquire("orderbook").unwrap();
        let stats = limiter.stats();
        assert_eq!(stats.active, 3);
        assert_eq!(stats.per_feed.quote, 1);
        assert_eq!(stats.per_feed.orderbook, 2);
        assert_eq!(stats.per_feed.tickers, 0);
    }

    #[test]
    fn new_state_seeds_demo_account() {
        let state = AppState::new(ServerConfig::default()).unwrap();
        let demo = state.users.get("demo").unwrap();
        assert_eq!(demo.tier, Tier::Intermediate);
        assert!(state.users.verify("demo", "demo123").is_some());
        assert!(state.store.contains("demo"));
    }

    #[tokio::test]
    async fn snapshot_prices_open_positions() {
        let state = AppState::new(ServerConfig::default()).unwrap();
        state
            .engine
            .buy("demo", "AAPL", Market::Us, dec!(10), dec!(150))
            .unwrap();

        let snapshot = state.portfolio_snapshot("demo").await.unwrap();
        assert_eq!(snapshot.positions.len(), 1);
        let position = &snapshot.positions[0];
        assert!(position.current_price.is_some());
        let value = position.current_value.unwrap();
        assert_eq!(snapshot.equity, snapshot.cash_balance + value);
        assert!(!snapshot.in_margin_call);
    }
}
