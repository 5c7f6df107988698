//! Live market data subscription channel.
//!
//! One `FeedChannel` drives one logical feed (`quote/{symbol}`,
//! `orderbook/{symbol}` or `tickers`) over WebSocket:
//! - Automatic reconnection with exponential backoff and jitter
//! - Typed frame decoding; malformed payloads dropped, never fatal
//! - Status transitions surfaced through a watch channel
//! - Deterministic teardown via cancellation token

pub mod channel;
pub mod error;
pub mod event;

pub use channel::{ChannelConfig, ChannelStatus, FeedChannel, FeedHandle, FeedKind};
pub use error::{FeedError, FeedResult};
pub use event::{decode_frame, FeedEvent};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
