//! Paper-trading HTTP and websocket server.
//!
//! Exposes the full paperdesk surface over axum: auth and sessions,
//! live and synthetic market data, simulated trading with margin
//! accounting, streaming feeds and Prometheus metrics. All state is
//! in-memory; restarting the process resets every account.

pub mod auth;
pub mod config;
pub mod error;
pub mod feeds;
pub mod routes;
pub mod state;

pub use auth::{SessionRegistry, Tier, UserProfile, UserRecord, UserRegistry};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, AppError, AppResult};
pub use routes::{create_router, run_server};
pub use state::{AppState, ConnectionLimiter};
