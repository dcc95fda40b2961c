//! Shared types for the SENTINEL agent.
//!
//! These types form the data model used across all modules. The
//! per-instrument record (`InstrumentState`) is the only durable state;
//! everything else is derived from it each cycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base move threshold used when nothing else is configured (2%).
pub const DEFAULT_BASE_THRESHOLD: Decimal = dec!(0.02);

/// Thresholds are fractions of price: strictly between 0 and 1.
pub fn is_valid_threshold(threshold: Decimal) -> bool {
    threshold > Decimal::ZERO && threshold < Decimal::ONE
}

// ---------------------------------------------------------------------------
// Instruments & quotes
// ---------------------------------------------------------------------------

/// A tradable instrument tracked independently with its own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Market-data ticker, also used as the state key (e.g. "SGLN.L").
    pub id: String,
    /// Human-readable name (e.g. "Gold").
    pub name: String,
}

impl Instrument {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A price observation returned by the market-data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Decimal,
    /// Daily return standard deviation over the lookback window, if computable.
    pub volatility: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Direction of a recommended order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            _ => Err(SentinelError::InvalidToken(format!("unknown action: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Instrument state
// ---------------------------------------------------------------------------

/// Durable per-instrument record.
///
/// Owned exclusively by that instrument's evaluation cycle and confirmation
/// handler. Missing keys in a persisted record are filled from defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentState {
    pub last_price: Option<Decimal>,
    pub last_buy_price: Option<Decimal>,
    pub last_sell_price: Option<Decimal>,
    /// Operator-declared monetary holding. Only operator commands change it.
    pub holding_value: Decimal,
    /// Effective move threshold as a fraction (0.02 = 2%). Always in (0, 1).
    pub threshold_pct: Decimal,
    pub pending_order: Option<Action>,
    /// Price at the moment the pending order was opened.
    pub pending_price: Option<Decimal>,
    pub buy_trigger: Option<Decimal>,
    pub sell_trigger: Option<Decimal>,
    pub last_volatility: Option<Decimal>,
    pub probe_mode: bool,
    pub probe_original_threshold: Option<Decimal>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for InstrumentState {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_THRESHOLD)
    }
}

impl InstrumentState {
    /// Fresh record for an instrument seen for the first time.
    pub fn new(base_threshold: Decimal) -> Self {
        Self {
            last_price: None,
            last_buy_price: None,
            last_sell_price: None,
            holding_value: Decimal::ZERO,
            threshold_pct: base_threshold,
            pending_order: None,
            pending_price: None,
            buy_trigger: None,
            sell_trigger: None,
            last_volatility: None,
            probe_mode: false,
            probe_original_threshold: None,
            last_updated: None,
        }
    }

    /// Whether a signal is awaiting operator confirmation.
    pub fn has_pending(&self) -> bool {
        self.pending_order.is_some()
    }

    /// Repair invariant violations in a record read from disk.
    ///
    /// Returns a description of every repair made (empty if the record was
    /// already consistent).
    pub fn repair(&mut self, base_threshold: Decimal) -> Vec<&'static str> {
        let mut repairs = Vec::new();

        if self.pending_order.is_some() != self.pending_price.is_some() {
            self.pending_order = None;
            self.pending_price = None;
            repairs.push("orphaned pending order fields cleared");
        }

        if !is_valid_threshold(self.threshold_pct) {
            self.threshold_pct = base_threshold;
            repairs.push("threshold outside (0, 1) reset to base");
        }

        if self.probe_mode && self.probe_original_threshold.is_none() {
            self.probe_mode = false;
            repairs.push("probe mode without original threshold cleared");
        }

        if !self.probe_mode && self.probe_original_threshold.is_some() {
            self.probe_original_threshold = None;
            repairs.push("stale probe original threshold cleared");
        }

        repairs
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for SENTINEL.
///
/// None of these are fatal: they are logged or shown to the operator and
/// the instrument's loop continues with the next scheduled cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SentinelError {
    #[error("No recent quote for {instrument}: {reason}")]
    DataUnavailable { instrument: String, reason: String },

    #[error("Cannot open {requested}: {pending} order already pending")]
    InvalidTransition { pending: Action, requested: Action },

    #[error("No pending order")]
    NoPendingOrder,

    #[error("Confirmation for {received} does not match pending {pending} order")]
    ActionMismatch { pending: Action, received: Action },

    #[error("Threshold must be between 0 and 1 (exclusive), got {0}")]
    InvalidThreshold(Decimal),

    #[error("Arithmetic overflow computing {0}")]
    Overflow(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Invalid confirmation token: {0}")]
    InvalidToken(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
