//! Market data layer for paperdesk.
//!
//! Composes live quotes from three sources behind one service:
//! - REST upstream provider with bounded retries
//! - TTL quote cache with timestamp-regression protection
//! - Synthetic random-walk engine for fallback and the demo tape
//!
//! Also hosts the static instrument directory and the exchange
//! session clock.

pub mod cache;
pub mod directory;
pub mod error;
pub mod provider;
pub mod service;
pub mod sessions;
pub mod synthetic;
pub mod upstream;

pub use cache::{QuoteCache, DEFAULT_TTL};
pub use error::{MarketError, MarketResult};
pub use provider::QuoteProvider;
pub use service::MarketDataService;
pub use sessions::{session_status, session_status_at, SessionStatus};
pub use synthetic::{DemoInstrument, SyntheticEngine, DEMO_UNIVERSE};
pub use upstream::{UpstreamProvider, DEFAULT_BASE_URL};
