//! Websocket streaming feeds.
//!
//! Three feeds share one publisher loop: per-symbol quotes, per-symbol
//! order book depth, and the all-symbols ticker tape. Frames carry a
//! `type` tag so subscribers can demux them; the shapes here are the
//! wire contract the feed decoder in client builds is written against.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use paperdesk_core::Market;
use paperdesk_telemetry::Metrics;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::state::{AppState, ConnectionGuard, ConnectionStats};

/// 1013 Try Again Later, sent when the connection cap is reached.
const CLOSE_TRY_AGAIN: u16 = 1013;

pub fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/ws/quote/{symbol}", get(quote_feed))
        .route("/ws/orderbook/{symbol}", get(orderbook_feed))
        .route("/ws/tickers", get(tickers_feed))
        .route("/ws/connections", get(connection_stats))
}

enum Feed {
    Quote(String),
    OrderBook(String),
    Tickers,
}

impl Feed {
    fn label(&self) -> &'static str {
        match self {
            Feed::Quote(_) => "quote",
            Feed::OrderBook(_) => "orderbook",
            Feed::Tickers => "tickers",
        }
    }

    fn interval(&self, state: &AppState) -> Duration {
        let millis = match self {
            Feed::Quote(_) => state.config.quote_interval_ms,
            Feed::OrderBook(_) => state.config.orderbook_interval_ms,
            Feed::Tickers => state.config.tickers_interval_ms,
        };
        Duration::from_millis(millis)
    }

    async fn frame(&self, state: &AppState) -> String {
        match self {
            Feed::Quote(symbol) => {
                let quote = state.market.get_quote(symbol, Market::Us).await;
                json!({"type": "quote", "data": quote}).to_string()
            }
            Feed::OrderBook(symbol) => {
                let book = state.market.order_book(symbol);
                json!({
                    "type": "orderbook",
                    "symbol": book.symbol,
                    "bids": book.bids,
                    "asks": book.asks,
                    "timestamp_ms": book.timestamp_ms,
                })
                .to_string()
            }
            Feed::Tickers => {
                let quotes = state.market.tape_quotes();
                json!({
                    "type": "tickers",
                    "data": quotes,
                    "timestamp_ms": Utc::now().timestamp_millis(),
                })
                .to_string()
            }
        }
    }
}

async fn quote_feed(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    subscribe(state, ws, Feed::Quote(symbol))
}

async fn orderbook_feed(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    subscribe(state, ws, Feed::OrderBook(symbol))
}

async fn tickers_feed(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    subscribe(state, ws, Feed::Tickers)
}

async fn connection_stats(State(state): State<AppState>) -> Json<ConnectionStats> {
    Json(state.limiter.stats())
}

/// Completes the upgrade either way; over-capacity clients get a close
/// frame on the socket rather than a failed handshake.
fn subscribe(state: AppState, ws: WebSocketUpgrade, feed: Feed) -> Response {
    let label = feed.label();
    match state.limiter.try_acquire(label) {
        Some(guard) => {
            info!("Feed subscriber connected ({})", label);
            ws.on_upgrade(move |socket| publish(socket, state, feed, guard))
        }
        None => {
            warn!(
                "Rejecting {} subscriber, at capacity ({} connections)",
                label,
                state.limiter.active()
            );
            ws.on_upgrade(reject_busy)
        }
    }
}

async fn reject_busy(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: CLOSE_TRY_AGAIN,
        reason: "server at capacity".into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

async fn publish(socket: WebSocket, state: AppState, feed: Feed, guard: ConnectionGuard) {
    let label = feed.label();
    let (mut sink, mut stream) = socket.split();
    let mut tick = tokio::time::interval(feed.interval(&state));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let frame = feed.frame(&state).await;
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
                Metrics::ws_frame_sent(label);
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Pings are answered by the library; ignore the rest
                    Some(Ok(_)) => {}
                }
            }
            _ = state.shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
    drop(guard);
    debug!("Feed subscriber disconnected ({})", label);
}
