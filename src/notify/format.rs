//! Operator-facing message text.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::strategy::{Resolution, Signal};
use crate::types::{Action, Instrument, InstrumentState, SentinelError};

fn pct(fraction: Decimal) -> String {
    format!("{:.2}%", fraction * dec!(100))
}

fn money(symbol: &str, amount: Decimal) -> String {
    format!("{symbol}{amount:.2}")
}

/// Alert asking the operator whether they acted on a fresh signal.
///
/// Returns `None` for `Signal::NoSignal`.
pub fn signal_message(
    instrument: &Instrument,
    state: &InstrumentState,
    signal: &Signal,
    threshold: Decimal,
    currency: &str,
) -> Option<String> {
    let (action, trigger, price, rule, anchor_label, anchor) = match *signal {
        Signal::NoSignal => return None,
        Signal::Buy { trigger, price } => (
            Action::Buy,
            trigger,
            price,
            "above your last SELL price",
            "Last sell",
            state.last_sell_price,
        ),
        Signal::Sell { trigger, price } => (
            Action::Sell,
            trigger,
            price,
            "below your last BUY price",
            "Last buy",
            state.last_buy_price,
        ),
    };

    let anchor = anchor.map_or_else(|| "n/a".to_string(), |a| money(currency, a));
    let probe_note = if state.probe_mode {
        "\n(Probe cycle: threshold temporarily lowered.)"
    } else {
        ""
    };

    Some(format!(
        "{instrument}: {action} signal.{probe_note}\n\n\
         Rule: Wait {} {rule}.\n\
         {anchor_label}: {anchor}\n\
         Trigger:  {}\n\
         Current:  {}\n\n\
         Did you {action} {} now?",
        pct(threshold),
        money(currency, trigger),
        money(currency, price),
        instrument.name,
    ))
}

/// Reply to the operator after a matching confirmation.
pub fn resolution_message(instrument: &Instrument, resolution: &Resolution, currency: &str) -> String {
    let mut text = match (resolution.accepted, resolution.recorded_price) {
        (true, Some(price)) => {
            let hint = match resolution.action {
                Action::Buy => "Use /setholding or /updateholding to adjust your holding.",
                Action::Sell => "Use /setholding or /updateholding if you changed your holding.",
            };
            format!(
                "{instrument}: {} confirmed.\nRecorded {} price: {}.\n{hint}",
                resolution.action,
                resolution.action,
                money(currency, price),
            )
        }
        _ => format!(
            "{instrument}: you chose NO.\nThe signal is ignored; no BUY/SELL recorded."
        ),
    };

    if let Some(restored) = resolution.restored_threshold {
        text.push_str(&format!(
            "\nProbe cycle complete. Threshold restored to {}.",
            pct(restored)
        ));
    }

    text
}

/// Reply to the operator when a confirmation could not be applied.
pub fn resolution_error_message(instrument: &Instrument, err: &SentinelError) -> String {
    match err {
        SentinelError::NoPendingOrder => {
            format!("{instrument}: no pending order found. Maybe already handled.")
        }
        SentinelError::ActionMismatch { pending, received } => format!(
            "{instrument}: mismatch between pending order ({pending}) and confirmation ({received}). \
             The pending order is unchanged."
        ),
        other => format!("{instrument}: {other}"),
    }
}

/// Status block for one instrument.
pub fn status_block(instrument: &Instrument, state: &InstrumentState, currency: &str) -> String {
    let Some(price) = state.last_price else {
        return format!("{instrument}: No price data yet.");
    };

    let mut lines = vec![
        instrument.to_string(),
        format!("Current price: {}", money(currency, price)),
        format!("Holding: {}", money(currency, state.holding_value)),
        format!("Threshold: {}", pct(state.threshold_pct)),
    ];

    if let Some(vol) = state.last_volatility {
        lines.push(format!("Volatility (daily std): {}", pct(vol)));
    }
    if let Some(last_buy) = state.last_buy_price {
        lines.push(format!("Last BUY: {}", money(currency, last_buy)));
    }
    if let Some(last_sell) = state.last_sell_price {
        lines.push(format!("Last SELL: {}", money(currency, last_sell)));
    }
    if let Some(trigger) = state.buy_trigger {
        lines.push(format!("BUY trigger:  {}", money(currency, trigger)));
    }
    if let Some(trigger) = state.sell_trigger {
        lines.push(format!("SELL trigger: {}", money(currency, trigger)));
    }
    if let (Some(order), Some(at)) = (state.pending_order, state.pending_price) {
        lines.push(format!("Pending order: {order} at {}", money(currency, at)));
    }
    if let (true, Some(original)) = (state.probe_mode, state.probe_original_threshold) {
        lines.push(format!("Probe mode: on (restores to {})", pct(original)));
    }
    if let Some(updated) = state.last_updated {
        lines.push(format!("Last updated: {} UTC", updated.format("%Y-%m-%d %H:%M:%S")));
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
