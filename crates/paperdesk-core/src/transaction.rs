//! Trade transaction records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::market::Market;

/// Direction of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeKind {
    Buy,
    Sell,
    Short,
    Cover,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "BUY",
            TradeKind::Sell => "SELL",
            TradeKind::Short => "SHORT",
            TradeKind::Cover => "COVER",
        }
    }

    /// True when the fill opens or adds to short exposure.
    pub fn is_short_side(&self) -> bool {
        matches!(self, TradeKind::Short | TradeKind::Cover)
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a single executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub symbol: String,
    pub market: Market,
    #[serde(rename = "type")]
    pub kind: TradeKind,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fees: Decimal,
    pub total_amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Stamp a new record at the current time. Fees are zero until a
    /// commission schedule exists.
    pub fn new(
        symbol: impl Into<String>,
        market: Market,
        kind: TradeKind,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            market,
            kind,
            quantity,
            price,
            fees: Decimal::ZERO,
            total_amount: quantity * price,
            timestamp: Utc::now(),
        }
    }
}
