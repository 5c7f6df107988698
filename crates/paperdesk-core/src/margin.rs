//! Margin evaluation for accounts carrying short exposure.
//!
//! Maintenance requirement is a flat fraction of gross short value.
//! The margin level is equity over maintenance expressed in percent,
//! with a sentinel value when no maintenance is required at all.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maintenance requirement as a fraction of gross short market value.
pub const MAINTENANCE_RATE: Decimal = Decimal::from_parts(3, 0, 0, false, 1);

/// Margin level reported when maintenance_required is zero.
pub const MARGIN_LEVEL_SENTINEL: Decimal = Decimal::from_parts(999, 0, 0, false, 0);

/// Margin level below which the account is in the call zone, percent.
pub const MARGIN_CALL_LEVEL: Decimal = Decimal::from_parts(120, 0, 0, false, 0);

/// Margin level below which the account is in the warning zone, percent.
pub const WARNING_LEVEL: Decimal = Decimal::from_parts(150, 0, 0, false, 0);

/// Risk zone derived from the margin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginZone {
    Safe,
    Warning,
    MarginCall,
}

/// Point-in-time margin evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginStatus {
    pub equity: Decimal,
    pub maintenance_required: Decimal,
    pub margin_headroom: Decimal,
    pub in_margin_call: bool,
    pub margin_level_percent: Decimal,
    pub zone: MarginZone,
}

impl MarginStatus {
    /// Evaluate margin state from account equity and the maintenance
    /// requirement already computed from short exposure.
    pub fn evaluate(equity: Decimal, maintenance_required: Decimal) -> Self {
        let margin_headroom = equity - maintenance_required;
        let in_margin_call = equity < maintenance_required;
        let margin_level_percent = if maintenance_required.is_zero() {
            MARGIN_LEVEL_SENTINEL
        } else {
            (equity / maintenance_required * Decimal::ONE_HUNDRED).round_dp(2)
        };
        let zone = if margin_level_percent < MARGIN_CALL_LEVEL {
            MarginZone::MarginCall
        } else if margin_level_percent < WARNING_LEVEL {
            MarginZone::Warning
        } else {
            MarginZone::Safe
        };
        Self {
            equity,
            maintenance_required,
            margin_headroom,
            in_margin_call,
            margin_level_percent,
            zone,
        }
    }

    /// Maintenance requirement for a given gross short market value.
    pub fn maintenance_for(gross_short_value: Decimal) -> Decimal {
        gross_short_value * MAINTENANCE_RATE
    }
}
