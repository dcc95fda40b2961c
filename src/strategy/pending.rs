//! Pending-order state machine.
//!
//! `Idle` → `Pending(action, price)` → `Idle`. An order is opened when a
//! signal fires and resolved only by an operator response. A probe cycle
//! temporarily overrides the threshold until the next resolution.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::types::{is_valid_threshold, Action, InstrumentState, SentinelError};

/// Outcome of a matching operator response.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub action: Action,
    pub accepted: bool,
    /// Anchor price recorded on acceptance (`None` on rejection).
    pub recorded_price: Option<Decimal>,
    /// Threshold restored because a probe cycle ended here.
    pub restored_threshold: Option<Decimal>,
}

/// Open a pending order. Legal only while idle.
pub fn open(state: &mut InstrumentState, action: Action, price: Decimal) -> Result<(), SentinelError> {
    if let Some(pending) = state.pending_order {
        return Err(SentinelError::InvalidTransition {
            pending,
            requested: action,
        });
    }

    state.pending_order = Some(action);
    state.pending_price = Some(price);
    debug!(action = %action, price = %price, "Pending order opened");
    Ok(())
}

/// Resolve the pending order with the operator's answer.
///
/// A mismatched action leaves the state untouched. Otherwise the pending
/// fields are cleared whether the order was accepted or rejected.
pub fn resolve(
    state: &mut InstrumentState,
    action: Action,
    accepted: bool,
) -> Result<Resolution, SentinelError> {
    let (pending, pending_price) = match (state.pending_order, state.pending_price) {
        (Some(pending), Some(price)) => (pending, price),
        _ => return Err(SentinelError::NoPendingOrder),
    };

    if action != pending {
        return Err(SentinelError::ActionMismatch {
            pending,
            received: action,
        });
    }

    let recorded_price = if accepted {
        match action {
            Action::Buy => state.last_buy_price = Some(pending_price),
            Action::Sell => state.last_sell_price = Some(pending_price),
        }
        Some(pending_price)
    } else {
        None
    };

    state.pending_order = None;
    state.pending_price = None;

    let restored_threshold = end_probe(state);

    info!(
        action = %action,
        accepted,
        recorded = ?recorded_price,
        restored_threshold = ?restored_threshold,
        "Pending order resolved"
    );

    Ok(Resolution {
        action,
        accepted,
        recorded_price,
        restored_threshold,
    })
}

/// Begin a low-threshold probe cycle. Does not open an order by itself.
///
/// If a probe is already running, the original pre-probe threshold is
/// kept and only the probe threshold changes.
pub fn start_probe(state: &mut InstrumentState, probe_threshold: Decimal) -> Result<(), SentinelError> {
    if !is_valid_threshold(probe_threshold) {
        return Err(SentinelError::InvalidThreshold(probe_threshold));
    }

    if !state.probe_mode {
        state.probe_original_threshold = Some(state.threshold_pct);
        state.probe_mode = true;
    }
    state.threshold_pct = probe_threshold;

    info!(
        probe_threshold = %probe_threshold,
        original = ?state.probe_original_threshold,
        "Probe mode started"
    );
    Ok(())
}

fn end_probe(state: &mut InstrumentState) -> Option<Decimal> {
    if !state.probe_mode {
        return None;
    }
    let original = state.probe_original_threshold.take()?;
    state.threshold_pct = original;
    state.probe_mode = false;
    Some(original)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
