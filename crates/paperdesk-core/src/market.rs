//! Market (exchange) identifiers.
//!
//! Two markets are supported: US equities and Indian equities (NSE).
//! Indian symbols are mapped through a fixed exchange-suffix rule before
//! they are handed to the upstream provider.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exchange suffix appended to Indian symbols for the upstream provider.
pub const NSE_SUFFIX: &str = ".NS";

/// Market identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "IN")]
    In,
}

impl Market {
    /// String form used on the wire ("US" / "IN").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::In => "IN",
        }
    }

    /// Map a display symbol to the symbol the upstream provider expects.
    ///
    /// US symbols pass through unchanged. Indian symbols get the NSE
    /// suffix appended unless already present.
    pub fn provider_symbol(&self, symbol: &str) -> String {
        match self {
            Self::Us => symbol.to_string(),
            Self::In => {
                if symbol.ends_with(NSE_SUFFIX) {
                    symbol.to_string()
                } else {
                    format!("{symbol}{NSE_SUFFIX}")
                }
            }
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Market {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "US" | "us" => Ok(Self::Us),
            "IN" | "in" => Ok(Self::In),
            other => Err(CoreError::InvalidMarket(other.to_string())),
        }
    }
}
