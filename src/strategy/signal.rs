//! Buy/sell trigger detection.
//!
//! A BUY fires once price has risen `threshold` above the last confirmed
//! SELL; a SELL fires once price has fallen `threshold` below the last
//! confirmed BUY. An instrument needs at least one confirmed fill before
//! any signal can fire.

use rust_decimal::Decimal;
use tracing::debug;

use crate::types::{Action, InstrumentState, SentinelError};

/// Outcome of a single detector evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    NoSignal,
    Buy { trigger: Decimal, price: Decimal },
    Sell { trigger: Decimal, price: Decimal },
}

impl Signal {
    pub fn action(&self) -> Option<Action> {
        match self {
            Signal::NoSignal => None,
            Signal::Buy { .. } => Some(Action::Buy),
            Signal::Sell { .. } => Some(Action::Sell),
        }
    }

    pub fn fired(&self) -> bool {
        !matches!(self, Signal::NoSignal)
    }
}

/// Recompute triggers for `state` and decide whether a signal fires.
///
/// Stores `buy_trigger`/`sell_trigger` on every call made while idle. While
/// an order is pending nothing is touched and `NoSignal` is returned. The
/// pending fields are never modified here.
///
/// Fails with `Overflow` if a trigger is not representable; the state is
/// left untouched in that case.
pub fn evaluate(
    state: &mut InstrumentState,
    current_price: Decimal,
    threshold: Decimal,
) -> Result<Signal, SentinelError> {
    if state.has_pending() {
        return Ok(Signal::NoSignal);
    }

    let buy_trigger = state
        .last_sell_price
        .map(|last_sell| scale(last_sell, Decimal::ONE + threshold, "BUY trigger"))
        .transpose()?;
    let sell_trigger = state
        .last_buy_price
        .map(|last_buy| scale(last_buy, Decimal::ONE - threshold, "SELL trigger"))
        .transpose()?;

    if buy_trigger.is_some() {
        state.buy_trigger = buy_trigger;
    }
    if sell_trigger.is_some() {
        state.sell_trigger = sell_trigger;
    }

    // BUY is checked first and wins when both conditions hold.
    if let Some(trigger) = buy_trigger {
        if current_price >= trigger {
            debug!(price = %current_price, trigger = %trigger, "BUY condition met");
            return Ok(Signal::Buy {
                trigger,
                price: current_price,
            });
        }
    }

    if let Some(trigger) = sell_trigger {
        if current_price <= trigger {
            debug!(price = %current_price, trigger = %trigger, "SELL condition met");
            return Ok(Signal::Sell {
                trigger,
                price: current_price,
            });
        }
    }

    Ok(Signal::NoSignal)
}

fn scale(anchor: Decimal, factor: Decimal, what: &str) -> Result<Decimal, SentinelError> {
    anchor
        .checked_mul(factor)
        .ok_or_else(|| SentinelError::Overflow(what.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
