//! Trade rejection taxonomy.
//!
//! Display strings are served verbatim as API error details, so they
//! stay lowercase and terse. Changing one is a wire-format change.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error("quantity must be > 0")]
    InvalidQuantity,

    #[error("insufficient cash")]
    InsufficientCash,

    #[error("no long position to sell")]
    NoLongPosition,

    #[error("not enough shares to sell")]
    NotEnoughShares,

    #[error("symbol not shortable")]
    NotShortable,

    #[error("insufficient cash for initial short margin")]
    InsufficientInitialMargin,

    #[error("no short position to cover")]
    NoShortPosition,

    #[error("cover qty exceeds shorted shares")]
    CoverExceedsShort,

    #[error("insufficient cash to cover")]
    InsufficientCashToCover,

    #[error("unknown account")]
    UnknownAccount,
}

impl TradeError {
    /// Stable label for the rejection counter.
    pub fn reason(&self) -> &'static str {
        match self {
            TradeError::InvalidQuantity => "invalid_quantity",
            TradeError::InsufficientCash => "insufficient_cash",
            TradeError::NoLongPosition => "no_long_position",
            TradeError::NotEnoughShares => "not_enough_shares",
            TradeError::NotShortable => "not_shortable",
            TradeError::InsufficientInitialMargin => "insufficient_initial_margin",
            TradeError::NoShortPosition => "no_short_position",
            TradeError::CoverExceedsShort => "cover_exceeds_short",
            TradeError::InsufficientCashToCover => "insufficient_cash_to_cover",
            TradeError::UnknownAccount => "unknown_account",
        }
    }
}

pub type TradeResult<T> = Result<T, TradeError>;
