//! Feed channel state machine.
//!
//! Owns one WebSocket connection per logical feed and keeps it alive:
//! connect, decode, forward, and on failure schedule a reconnect with
//! exponential backoff. Every state transition is published on a watch
//! channel so subscribers observe reconnects, never a silent retry.

use crate::error::{FeedError, FeedResult};
use crate::event::{decode_frame, FeedEvent};
use futures_util::{SinkExt, StreamExt};
use paperdesk_telemetry::Metrics;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Logical feed identity. One channel instance serves exactly one feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Per-symbol quote stream (1s cadence server-side).
    Quote { symbol: String },
    /// Per-symbol depth stream (500ms cadence server-side).
    OrderBook { symbol: String },
    /// Whole-universe ticker sweep (1s cadence server-side).
    Tickers,
}

impl FeedKind {
    /// WebSocket route for this feed.
    pub fn path(&self) -> String {
        match self {
            Self::Quote { symbol } => format!("/ws/quote/{}", symbol),
            Self::OrderBook { symbol } => format!("/ws/orderbook/{}", symbol),
            Self::Tickers => "/ws/tickers".to_string(),
        }
    }

    /// Metric label for this feed.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Quote { .. } => "quote",
            Self::OrderBook { .. } => "orderbook",
            Self::Tickers => "tickers",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quote { symbol } => write!(f, "quote:{}", symbol),
            Self::OrderBook { symbol } => write!(f, "orderbook:{}", symbol),
            Self::Tickers => write!(f, "tickers"),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket origin, e.g. `ws://127.0.0.1:8000`.
    pub base_url: String,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Initial delay for exponential backoff.
    pub reconnect_initial_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Decoded event buffer size.
    pub event_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: "ws://127.0.0.1:8000".to_string(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_initial_delay_ms: 3000,
            reconnect_max_delay_ms: 30_000,
            event_buffer: 256,
        }
    }
}

/// Channel state published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Transport handshake in progress.
    Connecting,
    /// Connected and delivering frames.
    Open,
    /// Not connected. `retry_in` carries the scheduled backoff delay;
    /// `None` once the channel has given up or been shut down.
    Disconnected { retry_in: Option<Duration> },
}

impl ChannelStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Disconnected { .. } => "disconnected",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Subscriber half of a feed channel.
///
/// Dropping the handle shuts the driver down: with the receiver gone
/// there is nothing left to deliver to.
pub struct FeedHandle {
    events: mpsc::Receiver<FeedEvent>,
    status: watch::Receiver<ChannelStatus>,
    shutdown: CancellationToken,
}

impl FeedHandle {
    /// Receive the next decoded event.
    ///
    /// Returns `None` once the driver task has exited and the buffer is
    /// drained.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }

    /// Current channel status.
    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Wait for the next status transition.
    ///
    /// Returns `None` if the channel is gone. The terminal state for a
    /// finished driver is `Disconnected { retry_in: None }`.
    pub async fn status_changed(&mut self) -> Option<ChannelStatus> {
        self.status.changed().await.ok()?;
        Some(*self.status.borrow())
    }

    /// Request shutdown of the driver task.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Driver half of a feed channel.
///
/// `new` builds the channel/handle pair, `connect` spawns the driver
/// task. The driver reconnects on failure until shut down or the
/// attempt bound is reached.
pub struct FeedChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    kind: FeedKind,
    config: ChannelConfig,
    status_tx: watch::Sender<ChannelStatus>,
    shutdown: CancellationToken,
    /// Taken by the first `connect` call; later calls are no-ops.
    event_tx: Mutex<Option<mpsc::Sender<FeedEvent>>>,
}

impl FeedChannel {
    /// Create a channel for one logical feed.
    pub fn new(kind: FeedKind, config: ChannelConfig) -> (Self, FeedHandle) {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Disconnected { retry_in: None });
        let shutdown = CancellationToken::new();

        let channel = Self {
            inner: Arc::new(ChannelInner {
                kind,
                config,
                status_tx,
                shutdown: shutdown.clone(),
                event_tx: Mutex::new(Some(event_tx)),
            }),
        };
        let handle = FeedHandle {
            events: event_rx,
            status: status_rx,
            shutdown,
        };
        (channel, handle)
    }

    /// Spawn the driver task. Idempotent: a second call is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let event_tx = match self.inner.event_tx.lock().take() {
            Some(tx) => tx,
            None => {
                debug!(feed = %self.inner.kind, "connect called on running channel, ignoring");
                return;
            }
        };
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.run(event_tx).await;
        });
    }

    /// Feed this channel serves.
    pub fn kind(&self) -> &FeedKind {
        &self.inner.kind
    }

    /// Current channel status.
    pub fn status(&self) -> ChannelStatus {
        *self.inner.status_tx.borrow()
    }

    /// Signal graceful shutdown.
    ///
    /// Cancels the shutdown token, which aborts an in-flight backoff
    /// sleep and closes the active transport.
    pub fn shutdown(&self) {
        info!(feed = %self.inner.kind, "feed channel shutdown requested");
        self.inner.shutdown.cancel();
    }

    /// Check whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl ChannelInner {
    async fn run(self: Arc<Self>, event_tx: mpsc::Sender<FeedEvent>) {
        let mut attempt = 0u32;

        loop {
            if self.shutdown.is_cancelled() {
                info!(feed = %self.kind, "shutdown requested, exiting feed loop");
                self.set_status(ChannelStatus::Disconnected { retry_in: None });
                return;
            }

            self.set_status(ChannelStatus::Connecting);

            let reason = match self.run_session(&event_tx, &mut attempt).await {
                Ok(()) => {
                    info!(feed = %self.kind, "feed connection closed");
                    "closed"
                }
                Err(FeedError::ConnectionFailed(e)) => {
                    warn!(feed = %self.kind, error = %e, "feed connect failed");
                    "connect"
                }
                Err(e) => {
                    warn!(feed = %self.kind, error = %e, "feed connection error");
                    "error"
                }
            };

            if self.shutdown.is_cancelled() {
                info!(feed = %self.kind, "shutdown requested after disconnect, not reconnecting");
                self.set_status(ChannelStatus::Disconnected { retry_in: None });
                return;
            }

            attempt += 1;
            Metrics::feed_reconnect(reason);

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(feed = %self.kind, attempt, "max reconnection attempts reached");
                self.set_status(ChannelStatus::Disconnected { retry_in: None });
                return;
            }

            let delay = backoff_delay(&self.config, attempt);
            self.set_status(ChannelStatus::Disconnected {
                retry_in: Some(delay),
            });
            warn!(
                feed = %self.kind,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "feed reconnecting after backoff"
            );

            // Wait for the delay OR shutdown (cancellation-aware sleep)
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.cancelled() => {
                    info!(feed = %self.kind, "shutdown requested during backoff, exiting");
                    self.set_status(ChannelStatus::Disconnected { retry_in: None });
                    return;
                }
            }
        }
    }

    async fn run_session(
        &self,
        event_tx: &mpsc::Sender<FeedEvent>,
        attempt: &mut u32,
    ) -> FeedResult<()> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.kind.path()
        );
        debug!(feed = %self.kind, url = %url, "connecting feed channel");

        // TCP_NODELAY for lower push latency
        let (ws_stream, _response) = connect_async_tls_with_config(&url, None, true, None)
            .await
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        *attempt = 0;
        self.set_status(ChannelStatus::Open);
        info!(feed = %self.kind, "feed channel open");

        loop {
            tokio::select! {
                // Shutdown signal - highest priority
                () = self.shutdown.cancelled() => {
                    info!(feed = %self.kind, "shutdown signal received in feed loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(feed = %self.kind, error = %e, "close frame send failed during shutdown");
                    }
                    return Ok(());
                }

                // Incoming frame
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(event_tx, &text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!(feed = %self.kind, "received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "normal close".to_string()));
                            warn!(feed = %self.kind, code, reason = %reason, "feed closed by server");
                            return Err(FeedError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(feed = %self.kind, error = %e, "feed read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!(feed = %self.kind, "feed stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Decode one text frame and forward it downstream.
    ///
    /// Malformed frames are dropped and counted, unknown types ignored;
    /// neither tears the connection down.
    async fn handle_frame(&self, event_tx: &mpsc::Sender<FeedEvent>, text: &str) {
        match decode_frame(text) {
            Ok(Some(event)) => {
                Metrics::feed_frame(event.label());
                if event_tx.send(event).await.is_err() {
                    debug!(feed = %self.kind, "event receiver dropped");
                }
            }
            Ok(None) => {
                debug!(feed = %self.kind, "ignoring frame with unknown type");
            }
            Err(e) => {
                Metrics::feed_malformed();
                warn!(feed = %self.kind, error = %e, "dropping malformed feed frame");
            }
        }
    }

    fn set_status(&self, status: ChannelStatus) {
        match status {
            ChannelStatus::Open => Metrics::feed_connected(),
            _ => Metrics::feed_disconnected(),
        }
        Metrics::feed_state_set(status.label());
        self.status_tx.send_replace(status);
    }
}

fn backoff_delay(config: &ChannelConfig, attempt: u32) -> Duration {
    let base = config.reconnect_initial_delay_ms;
    let max = config.reconnect_max_delay_ms;

    // Exponential backoff: base * 2^(attempt-1), capped at max
    let exponent = attempt.saturating_sub(1).min(10);
    let delay = base.saturating_mul(1u64 << exponent);
    let delay = delay.min(max);

    // Add jitter (0-1000ms)
    let jitter = rand_jitter();
    Duration::from_millis(delay + jitter)
}

/// Generate random jitter (0-1000ms).
fn rand_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as u64
}
