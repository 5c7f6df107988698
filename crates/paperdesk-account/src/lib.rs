//! Paper trading account engine.
//!
//! Holds every account in memory: cash, signed-share positions and an
//! append-only trade log. [`TradeEngine`] enforces the buy/sell/short/
//! cover rule set at caller-supplied prices, [`ShortableDirectory`]
//! scopes what may be sold short and at what borrow cost, and
//! [`build_snapshot`] prices an account into the portfolio summary
//! served over the API.

pub mod engine;
pub mod error;
pub mod shortable;
pub mod snapshot;
pub mod store;

pub use engine::{TradeEngine, TradeReceipt};
pub use error::{TradeError, TradeResult};
pub use shortable::{
    daily_interest, initial_short_margin_required, ShortableDirectory, ShortableEntry,
};
pub use snapshot::build_snapshot;
pub use store::{Account, AccountStore, InterestCharge, STARTING_CASH};
