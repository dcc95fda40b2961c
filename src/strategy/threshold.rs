//! Volatility-adaptive move threshold.
//!
//! Calm markets get a slightly tighter threshold (more sensitive), choppy
//! markets a wider one (more conservative).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::DEFAULT_BASE_THRESHOLD;

/// Floor applied to the low-volatility threshold.
const MIN_THRESHOLD: Decimal = dec!(0.01);
const LOW_VOL_MULTIPLIER: Decimal = dec!(0.75);
const HIGH_VOL_MULTIPLIER: Decimal = dec!(1.5);

/// Threshold parameters (defaults, overridden by config.toml at runtime).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    pub base: Decimal,
    /// Daily volatility below this is "calm".
    pub vol_low: Decimal,
    /// Daily volatility above this is "choppy".
    pub vol_high: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_THRESHOLD,
            vol_low: dec!(0.01),
            vol_high: dec!(0.03),
        }
    }
}

impl ThresholdConfig {
    pub fn adapt(&self, volatility: Option<Decimal>) -> Decimal {
        adapt_threshold(volatility, self.base, self.vol_low, self.vol_high)
    }
}

/// Map a volatility estimate to a move threshold. Pure and total.
pub fn adapt_threshold(
    volatility: Option<Decimal>,
    base: Decimal,
    vol_low: Decimal,
    vol_high: Decimal,
) -> Decimal {
    match volatility {
        None => base,
        Some(v) if v < vol_low => (base * LOW_VOL_MULTIPLIER).max(MIN_THRESHOLD),
        Some(v) if v > vol_high => base * HIGH_VOL_MULTIPLIER,
        Some(_) => base,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
