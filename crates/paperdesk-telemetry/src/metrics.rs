//! Prometheus metrics for paperdesk.
//!
//! Covers the hot paths on both halves of the system:
//! - Feed channel state and reconnects
//! - Quote cache effectiveness
//! - Upstream provider health and fallback
//! - Trade flow through the paper account engine
//! - Server-side WebSocket fanout
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    register_int_counter, register_int_gauge, CounterVec, Encoder, Gauge, GaugeVec, HistogramVec,
    IntCounter, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Feed channel connection state (1 = open, 0 = not open).
pub static FEED_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "paperdesk_feed_connected",
        "Feed channel connection state (1=open)"
    )
    .unwrap()
});

/// Feed channel state machine current state.
/// Labels: state (connecting/open/disconnected)
pub static FEED_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "paperdesk_feed_state",
        "Feed channel state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total feed reconnection attempts.
pub static FEED_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "paperdesk_feed_reconnect_total",
        "Total feed channel reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Total decoded feed frames by kind.
/// Labels: kind (quote/orderbook/tickers)
pub static FEED_FRAMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "paperdesk_feed_frames_total",
        "Total decoded feed frames by kind",
        &["kind"]
    )
    .unwrap()
});

/// Total feed messages dropped as malformed.
pub static FEED_MALFORMED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "paperdesk_feed_malformed_total",
        "Total feed messages dropped because they failed to decode"
    )
    .unwrap()
});

/// Quote cache hits.
pub static QUOTE_CACHE_HITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "paperdesk_quote_cache_hits_total",
        "Total quote cache hits within TTL"
    )
    .unwrap()
});

/// Quote cache misses (absent or expired).
pub static QUOTE_CACHE_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "paperdesk_quote_cache_misses_total",
        "Total quote cache misses (absent or past TTL)"
    )
    .unwrap()
});

/// Cache writes rejected for carrying an older timestamp than the
/// entry already stored.
pub static QUOTE_CACHE_STALE_WRITES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "paperdesk_quote_cache_stale_writes_total",
        "Total cache writes rejected due to timestamp regression"
    )
    .unwrap()
});

/// Upstream provider failures by reason.
/// Labels: reason (http/decode/bad_status/exhausted)
pub static PROVIDER_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "paperdesk_provider_failures_total",
        "Total upstream provider request failures",
        &["reason"]
    )
    .unwrap()
});

/// Upstream provider request latency in milliseconds.
pub static PROVIDER_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "paperdesk_provider_latency_ms",
        "Upstream provider request latency in milliseconds",
        &["endpoint"],
        vec![5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0]
    )
    .unwrap()
});

/// Quotes served by source.
/// Labels: source (cache/upstream/synthetic)
pub static QUOTES_SERVED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "paperdesk_quotes_served_total",
        "Total quotes served by data source",
        &["source"]
    )
    .unwrap()
});

/// Executed trades by kind.
/// Labels: kind (buy/sell/short/cover)
pub static TRADES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "paperdesk_trades_total",
        "Total executed paper trades by kind",
        &["kind"]
    )
    .unwrap()
});

/// Rejected trades by reason.
pub static TRADES_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "paperdesk_trades_rejected_total",
        "Total rejected paper trades by reason",
        &["reason"]
    )
    .unwrap()
});

/// Accounts currently in a hard margin call.
pub static ACCOUNTS_IN_MARGIN_CALL: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "paperdesk_accounts_in_margin_call",
        "Number of accounts whose equity is below maintenance"
    )
    .unwrap()
});

/// Currently connected WebSocket feed clients.
pub static WS_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "paperdesk_ws_clients",
        "Currently connected WebSocket feed clients"
    )
    .unwrap()
});

/// Total WebSocket frames pushed to clients by kind.
pub static WS_FRAMES_SENT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "paperdesk_ws_frames_sent_total",
        "Total WebSocket frames pushed to clients by kind",
        &["kind"]
    )
    .unwrap()
});

/// Active authenticated sessions.
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "paperdesk_sessions_active",
        "Active authenticated sessions"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record feed channel opened.
    pub fn feed_connected() {
        FEED_CONNECTED.set(1.0);
    }

    /// Record feed channel no longer open.
    pub fn feed_disconnected() {
        FEED_CONNECTED.set(0.0);
    }

    /// Set feed state machine state.
    /// Only the active state should be set to 1, all others to 0.
    pub fn feed_state_set(state: &str) {
        for s in &["connecting", "open", "disconnected"] {
            FEED_STATE.with_label_values(&[s]).set(0.0);
        }
        FEED_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Record feed reconnection attempt.
    pub fn feed_reconnect(reason: &str) {
        FEED_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a decoded feed frame.
    pub fn feed_frame(kind: &str) {
        FEED_FRAMES_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a malformed feed message dropped.
    pub fn feed_malformed() {
        FEED_MALFORMED_TOTAL.inc();
    }

    /// Record quote cache hit.
    pub fn cache_hit() {
        QUOTE_CACHE_HITS_TOTAL.inc();
    }

    /// Record quote cache miss.
    pub fn cache_miss() {
        QUOTE_CACHE_MISSES_TOTAL.inc();
    }

    /// Record a cache write rejected for timestamp regression.
    pub fn cache_stale_write() {
        QUOTE_CACHE_STALE_WRITES_TOTAL.inc();
    }

    /// Record upstream provider failure.
    pub fn provider_failure(reason: &str) {
        PROVIDER_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record upstream provider request latency.
    pub fn provider_latency(endpoint: &str, latency_ms: f64) {
        PROVIDER_LATENCY_MS
            .with_label_values(&[endpoint])
            .observe(latency_ms);
    }

    /// Record a quote served from the given source.
    pub fn quote_served(source: &str) {
        QUOTES_SERVED_TOTAL.with_label_values(&[source]).inc();
    }

    /// Record an executed trade.
    pub fn trade_executed(kind: &str) {
        TRADES_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a rejected trade.
    pub fn trade_rejected(reason: &str) {
        TRADES_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Update the margin-call account count.
    pub fn accounts_in_margin_call(count: i64) {
        ACCOUNTS_IN_MARGIN_CALL.set(count);
    }

    /// Increment connected WebSocket client count.
    pub fn ws_client_connected() {
        WS_CLIENTS.inc();
    }

    /// Decrement connected WebSocket client count.
    pub fn ws_client_disconnected() {
        WS_CLIENTS.dec();
    }

    /// Record a WebSocket frame pushed to a client.
    pub fn ws_frame_sent(kind: &str) {
        WS_FRAMES_SENT_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Update active session count.
    pub fn sessions_active(count: i64) {
        SESSIONS_ACTIVE.set(count);
    }
}

/// Encode every registered metric in Prometheus text format.
pub fn gather_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_registered_metrics() {
        Metrics::feed_connected();
        Metrics::cache_hit();
        Metrics::quote_served("synthetic");
        let text = gather_metrics().unwrap();
        assert!(text.contains("paperdesk_feed_connected"));
        assert!(text.contains("paperdesk_quote_cache_hits_total"));
        assert!(text.contains("paperdesk_quotes_served_total"));
    }

    #[test]
    fn test_feed_state_is_exclusive() {
        Metrics::feed_state_set("open");
        Metrics::feed_state_set("disconnected");
        let open = FEED_STATE.with_label_values(&["open"]).get();
        let disconnected = FEED_STATE.with_label_values(&["disconnected"]).get();
        assert_eq!(open, 0.0);
        assert_eq!(disconnected, 1.0);
    }
}
