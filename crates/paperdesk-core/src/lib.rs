//! Core domain types for the paperdesk paper-trading system.
//!
//! This crate provides fundamental types used throughout the workspace:
//! - `Market`: Exchange identifier (US / IN) with provider symbol mapping
//! - `Quote`, `Bar`: Normalized market data
//! - `OrderBookSnapshot`: Level-2 depth with sort invariants
//! - `PortfolioSnapshot`, `Position`, `MarginStatus`: Account state and margin math
//! - `TransactionRecord`: Append-only trade log entries

pub mod bar;
pub mod book;
pub mod error;
pub mod margin;
pub mod market;
pub mod portfolio;
pub mod quote;
pub mod transaction;

pub use bar::{Bar, BarRange};
pub use book::{BookState, OrderBookSnapshot, OrderLevel};
pub use error::{CoreError, Result};
pub use margin::{MarginStatus, MarginZone, MAINTENANCE_RATE};
pub use market::Market;
pub use portfolio::{PortfolioSnapshot, Position};
pub use quote::{Quote, QuoteSource};
pub use transaction::{TradeKind, TransactionRecord};
