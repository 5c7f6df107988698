//! Client-side building blocks for paper-trading frontends.
//!
//! `ApiClient` wraps the REST surface with typed calls and a shared
//! `Session` holding the bearer token; `PortfolioHook` publishes
//! portfolio state to views over a watch channel; the view module
//! projects wire types into renderable rows and folds live feed
//! events into a `TickerBoard`.

pub mod api;
pub mod config;
pub mod error;
pub mod hook;
pub mod session;
pub mod view;

pub use api::{ApiClient, TokenResponse, TradeConfirmation, TradeIntent, UserProfile};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use hook::{PortfolioHook, PortfolioState};
pub use session::Session;
pub use view::{PositionRow, PositionSide, TickerBoard, TicketPreview, WatchlistRow};
