//! HTTP surface: route table, handlers and server bootstrap.

use std::net::SocketAddr;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use paperdesk_account::{ShortableEntry, TradeReceipt};
use paperdesk_core::{
    Bar, BarRange, Market, PortfolioSnapshot, Position, Quote, TradeKind, TransactionRecord,
};
use paperdesk_market::{directory, session_status};
use paperdesk_telemetry::gather_metrics;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{authenticate, require_tier, Tier, UserProfile};
use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult, AppError, AppResult};
use crate::feeds;
use crate::state::{spawn_margin_sampler, AppState};

/// Symbols on the index tape, quoted best-effort from the live source.
const TICKER_SYMBOLS: &[&str] = &["SPY", "QQQ", "DIA", "AAPL", "TSLA", "NVDA"];

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/upgrade-tier", put(upgrade_tier))
        .route("/market/quote/{symbol}", get(market_quote))
        .route("/market/quotes", get(market_quotes))
        .route("/market/search", get(market_search))
        .route("/market/ticker", get(market_ticker))
        .route("/market/status", get(market_status))
        .route("/market/candles/{symbol}", get(market_candles))
        .route("/portfolio", get(portfolio))
        .route("/portfolio/positions", get(portfolio_positions))
        .route("/portfolio/equity", get(portfolio_equity))
        .route("/portfolio/transactions", get(portfolio_transactions))
        .route("/trade/buy", post(trade_buy))
        .route("/trade/sell", post(trade_sell))
        .route("/trade/short", post(trade_short))
        .route("/trade/cover", post(trade_cover))
        .route("/trade/shortable", get(trade_shortable))
        .route("/admin/users", get(admin_users))
        .route("/admin/simulate-daily-interest", post(admin_daily_interest))
        .merge(feeds::feed_routes())
        .layer(cors)
        .with_state(state)
}

/// Binds and serves until ctrl-c, then drains the feeds.
pub async fn run_server(config: ServerConfig) -> AppResult<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid listen address: {e}")))?;
    let state = AppState::new(config)?;
    spawn_margin_sampler(state.clone());
    let shutdown = state.shutdown.clone();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, closing feeds");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let mut allowed = Vec::new();
    for origin in origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => allowed.push(value),
            Err(_) => warn!("Ignoring malformed CORS origin '{}'", origin),
        }
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn parse_market(raw: Option<&str>) -> ApiResult<Market> {
    match raw {
        Some(value) => Ok(value.parse()?),
        None => Ok(Market::Us),
    }
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn metrics() -> ApiResult<Response> {
    let body = gather_metrics().map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> ApiResult<Json<UserProfile>> {
    let record = state
        .users
        .register(&payload.username, &payload.email, &payload.password)?;
    state.store.open(&record.username);
    let cash = state.store.cash_balance(&record.username)?;
    Ok(Json(UserProfile::new(&record, cash)))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> ApiResult<Json<Value>> {
    let record = state
        .users
        .verify(&form.username, &form.password)
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;
    let token = state.sessions.issue(&record.username);
    Ok(Json(json!({"access_token": token, "token_type": "bearer"})))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<UserProfile>> {
    let user = authenticate(&state.sessions, &state.users, &headers)?;
    let cash = state.store.cash_balance(&user.username)?;
    Ok(Json(UserProfile::new(&user, cash)))
}

#[derive(Debug, Deserialize)]
struct UpgradeTierQuery {
    user_id: String,
    tier: String,
}

/// Dev-only tier switch, off unless the config enables it.
async fn upgrade_tier(
    State(state): State<AppState>,
    Query(query): Query<UpgradeTierQuery>,
) -> ApiResult<Json<Value>> {
    if !state.config.allow_tier_upgrade {
        return Err(ApiError::Forbidden("upgrade-tier disabled".to_string()));
    }
    let id = query
        .user_id
        .parse::<Uuid>()
        .map_err(|_| ApiError::NotFound("user not found".to_string()))?;
    state
        .users
        .get_by_id(id)
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    let tier =
        Tier::parse(&query.tier).ok_or_else(|| ApiError::BadRequest("invalid tier".to_string()))?;
    let updated = state
        .users
        .set_tier(id, tier)
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    info!("Set tier of {} to {}", updated.username, updated.tier);
    Ok(Json(json!({"status": "ok", "tier": updated.tier})))
}

#[derive(Debug, Deserialize)]
struct MarketQuery {
    market: Option<String>,
}

async fn market_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<MarketQuery>,
) -> ApiResult<Json<Quote>> {
    let market = parse_market(query.market.as_deref())?;
    Ok(Json(state.market.get_quote(&symbol, market).await))
}

#[derive(Debug, Deserialize)]
struct QuotesQuery {
    symbols: String,
    market: Option<String>,
}

/// Batch quotes, one row per symbol. A failed symbol yields an error
/// row instead of failing the whole batch.
async fn market_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuotesQuery>,
) -> ApiResult<Json<Value>> {
    let market = parse_market(query.market.as_deref())?;
    let mut rows = Vec::new();
    for symbol in query.symbols.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match state.market.get_quote_strict(symbol, market).await {
            Ok(quote) => rows.push(json!(quote)),
            Err(e) => rows.push(json!({
                "symbol": symbol,
                "price": 0,
                "change_percent": 0,
                "error": e.to_string(),
            })),
        }
    }
    Ok(Json(json!({"quotes": rows})))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: String,
    market: Option<String>,
}

async fn market_search(Query(query): Query<SearchQuery>) -> ApiResult<Json<Value>> {
    let market = parse_market(query.market.as_deref())?;
    let results = directory::search(&query.query, market);
    Ok(Json(json!({"results": results})))
}

async fn market_ticker(State(state): State<AppState>) -> Json<Value> {
    let mut items = Vec::new();
    for symbol in TICKER_SYMBOLS {
        match state.market.get_quote_strict(symbol, Market::Us).await {
            Ok(quote) => items.push(json!({
                "symbol": quote.symbol,
                "price": quote.price,
                "change": quote.change_percent,
            })),
            // Tape rows are best-effort; drop symbols the source cannot price
            Err(e) => debug!("Skipping tape symbol {}: {}", symbol, e),
        }
    }
    items.push(json!({
        "symbol": "NIFTY 50",
        "price": Decimal::new(243_154, 1),
        "change": Decimal::new(68, 2),
    }));
    items.push(json!({
        "symbol": "SENSEX",
        "price": Decimal::new(798_429, 1),
        "change": Decimal::new(54, 2),
    }));
    Json(json!({"items": items}))
}

async fn market_status() -> Json<Value> {
    Json(json!({
        "us_market": session_status(Market::Us),
        "india_market": session_status(Market::In),
    }))
}

#[derive(Debug, Deserialize)]
struct CandlesQuery {
    market: Option<String>,
    range: Option<String>,
}

async fn market_candles(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<CandlesQuery>,
) -> ApiResult<Json<Vec<Bar>>> {
    let market = parse_market(query.market.as_deref())?;
    let range: BarRange = query.range.as_deref().unwrap_or("1D").parse()?;
    let bars = state.market.get_bars(&symbol, market, range).await?;
    Ok(Json(bars))
}

async fn portfolio(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<PortfolioSnapshot>> {
    let user = authenticate(&state.sessions, &state.users, &headers)?;
    Ok(Json(state.portfolio_snapshot(&user.username).await?))
}

async fn portfolio_positions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Position>>> {
    let user = authenticate(&state.sessions, &state.users, &headers)?;
    let snapshot = state.portfolio_snapshot(&user.username).await?;
    Ok(Json(snapshot.positions))
}

async fn portfolio_equity(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let user = authenticate(&state.sessions, &state.users, &headers)?;
    let snapshot = state.portfolio_snapshot(&user.username).await?;
    Ok(Json(json!({
        "equity": snapshot.equity,
        "maintenance_required": snapshot.maintenance_required,
        "in_margin_call": snapshot.in_margin_call,
        "margin_headroom": snapshot.margin_headroom,
    })))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn portfolio_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<TransactionRecord>>> {
    let user = authenticate(&state.sessions, &state.users, &headers)?;
    let records = state.store.transactions(
        &user.username,
        page.limit.unwrap_or(50),
        page.offset.unwrap_or(0),
    )?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
struct TradeQuery {
    symbol: String,
    market: Option<String>,
    qty: Decimal,
}

/// Shared fill path: authenticate, gate short-side orders on tier,
/// price at the live quote, hand off to the engine.
async fn execute_trade(
    state: &AppState,
    headers: &HeaderMap,
    order: TradeQuery,
    kind: TradeKind,
) -> ApiResult<Json<TradeReceipt>> {
    let user = authenticate(&state.sessions, &state.users, headers)?;
    if kind.is_short_side() {
        require_tier(&user, Tier::Intermediate)?;
    }
    let market = parse_market(order.market.as_deref())?;
    let quote = state.market.get_quote(&order.symbol, market).await;
    let receipt = match kind {
        TradeKind::Buy => state
            .engine
            .buy(&user.username, &order.symbol, market, order.qty, quote.price),
        TradeKind::Sell => state
            .engine
            .sell(&user.username, &order.symbol, market, order.qty, quote.price),
        TradeKind::Short => state
            .engine
            .short(&user.username, &order.symbol, market, order.qty, quote.price),
        TradeKind::Cover => state
            .engine
            .cover(&user.username, &order.symbol, market, order.qty, quote.price),
    }?;
    Ok(Json(receipt))
}

async fn trade_buy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(order): Query<TradeQuery>,
) -> ApiResult<Json<TradeReceipt>> {
    execute_trade(&state, &headers, order, TradeKind::Buy).await
}

async fn trade_sell(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(order): Query<TradeQuery>,
) -> ApiResult<Json<TradeReceipt>> {
    execute_trade(&state, &headers, order, TradeKind::Sell).await
}

async fn trade_short(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(order): Query<TradeQuery>,
) -> ApiResult<Json<TradeReceipt>> {
    execute_trade(&state, &headers, order, TradeKind::Short).await
}

async fn trade_cover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(order): Query<TradeQuery>,
) -> ApiResult<Json<TradeReceipt>> {
    execute_trade(&state, &headers, order, TradeKind::Cover).await
}

async fn trade_shortable(
    State(state): State<AppState>,
    Query(query): Query<MarketQuery>,
) -> ApiResult<Json<Vec<ShortableEntry>>> {
    let market = match query.market.as_deref() {
        Some(raw) => Some(raw.parse::<Market>()?),
        None => None,
    };
    Ok(Json(state.engine.shortable().list(market)))
}

async fn admin_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<UserProfile>>> {
    authenticate(&state.sessions, &state.users, &headers)?;
    let mut profiles = Vec::new();
    for record in state.users.all() {
        let cash = state.store.cash_balance(&record.username)?;
        profiles.push(UserProfile::new(&record, cash));
    }
    Ok(Json(profiles))
}

/// Applies one day of borrow interest to every short position.
async fn admin_daily_interest(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    authenticate(&state.sessions, &state.users, &headers)?;
    let prices = state.price_all().await;
    let charges = state.store.apply_daily_interest(|symbol, market| {
        prices.get(&(symbol.to_string(), market)).copied()
    });
    info!("Charged borrow interest on {} short positions", charges.len());
    Ok(Json(json!({"applied": charges.len(), "details": charges})))
}
