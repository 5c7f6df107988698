//! Historical bar (candle) types.

use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Milliseconds since the Unix epoch (bar open time).
    pub timestamp_ms: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// Supported historical ranges for candle requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarRange {
    #[serde(rename = "1D")]
    Day1,
    #[serde(rename = "5D")]
    Day5,
    #[serde(rename = "1M")]
    Month1,
    #[serde(rename = "6M")]
    Month6,
    #[serde(rename = "1Y")]
    Year1,
}

impl BarRange {
    /// String form used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day1 => "1D",
            Self::Day5 => "5D",
            Self::Month1 => "1M",
            Self::Month6 => "6M",
            Self::Year1 => "1Y",
        }
    }

    /// Lookback window in days.
    pub fn lookback_days(&self) -> i64 {
        match self {
            Self::Day1 => 1,
            Self::Day5 => 5,
            Self::Month1 => 30,
            Self::Month6 => 182,
            Self::Year1 => 365,
        }
    }

    /// Provider resolution code for this range.
    ///
    /// Intraday ranges use minute resolutions, longer ranges daily bars.
    pub fn resolution(&self) -> &'static str {
        match self {
            Self::Day1 => "5",
            Self::Day5 => "15",
            Self::Month1 => "60",
            Self::Month6 => "D",
            Self::Year1 => "D",
        }
    }
}

impl fmt::Display for BarRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BarRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1D" => Ok(Self::Day1),
            "5D" => Ok(Self::Day5),
            "1M" => Ok(Self::Month1),
            "6M" => Ok(Self::Month6),
            "1Y" => Ok(Self::Year1),
            other => Err(CoreError::InvalidRange(other.to_string())),
        }
    }
}
