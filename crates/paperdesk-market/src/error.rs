//! Market data error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    /// Upstream data source failed. Callers recover via cache or the
    /// synthetic engine; raw transport errors never cross this boundary.
    #[error("Upstream provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Core error: {0}")]
    Core(#[from] paperdesk_core::CoreError),
}

pub type MarketResult<T> = Result<T, MarketError>;
