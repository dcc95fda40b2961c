//! Operator commands against the engine: status, holdings, probe.

use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{error, info};

use super::SignalEngine;
use crate::notify::command::{command_help, OperatorCommand};
use crate::notify::format;
use crate::strategy;
use crate::types::{Instrument, InstrumentState, SentinelError};

/// Point-in-time view of one instrument, for status surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSnapshot {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub state: InstrumentState,
}

impl SignalEngine {
    /// Execute an operator command and return the reply text.
    pub async fn execute(&self, command: OperatorCommand) -> String {
        match command {
            OperatorCommand::Start => self.start_text(),
            OperatorCommand::Help => command_help(),
            OperatorCommand::Status => self.status_report().await,
            OperatorCommand::SetHolding {
                instrument_id,
                amount,
            } => {
                self.with_state(&instrument_id, |instrument, state, symbol| {
                    state.holding_value = amount;
                    Ok(format!(
                        "Holding for {instrument} set to {symbol}{amount:.2}."
                    ))
                })
                .await
            }
            OperatorCommand::UpdateHolding {
                instrument_id,
                delta,
            } => {
                self.with_state(&instrument_id, |instrument, state, symbol| {
                    state.holding_value = state
                        .holding_value
                        .checked_add(delta)
                        .ok_or_else(|| SentinelError::Overflow("holding value".to_string()))?;
                    Ok(format!(
                        "Holding for {instrument} updated by {symbol}{delta:.2}. New holding: {symbol}{:.2}.",
                        state.holding_value
                    ))
                })
                .await
            }
            OperatorCommand::Probe {
                instrument_id,
                threshold,
            } => {
                let probe = threshold.unwrap_or(self.settings.probe_default);
                self.with_state(&instrument_id, |instrument, state, _| {
                    strategy::start_probe(state, probe)?;
                    let original = state.probe_original_threshold.unwrap_or(state.threshold_pct);
                    Ok(format!(
                        "Probe started for {instrument}: threshold {:.2}% until the next confirmation \
                         (then restored to {:.2}%).",
                        probe * dec!(100),
                        original * dec!(100),
                    ))
                })
                .await
            }
        }
    }

    /// Status text covering every tracked instrument.
    pub async fn status_report(&self) -> String {
        let blocks: Vec<String> = self
            .snapshot()
            .await
            .iter()
            .zip(&self.instruments)
            .map(|(snap, instrument)| {
                format::status_block(instrument, &snap.state, &self.settings.currency_symbol)
            })
            .collect();
        blocks.join("\n\n")
    }

    /// Current state of every instrument, read under each instrument's lock.
    pub async fn snapshot(&self) -> Vec<InstrumentSnapshot> {
        let mut out = Vec::with_capacity(self.instruments.len());
        for instrument in &self.instruments {
            let lock = self.lock_for(instrument);
            let _guard = lock.lock().await;
            out.push(InstrumentSnapshot {
                id: instrument.id.clone(),
                name: instrument.name.clone(),
                state: self.store.load(&instrument.id),
            });
        }
        out
    }

    fn start_text(&self) -> String {
        let minutes = (self.settings.scan_interval_secs / 60).max(1);
        let mut lines = vec![
            "Bot is running.".to_string(),
            format!(
                "I check these instruments every {minutes} minutes using your adaptive {:.0}% rule:",
                self.settings.threshold.base * dec!(100)
            ),
        ];
        lines.extend(self.instruments.iter().map(|i| format!("- {i}")));
        lines.push(String::new());
        lines.push(command_help());
        lines.join("\n")
    }

    /// Load → mutate → save one instrument's record under its lock.
    async fn with_state<F>(&self, instrument_id: &str, mutate: F) -> String
    where
        F: FnOnce(&Instrument, &mut InstrumentState, &str) -> Result<String, SentinelError>,
    {
        let Ok(instrument) = self.instrument(instrument_id) else {
            return self.unknown_instrument_text();
        };

        let lock = self.lock_for(instrument);
        let _guard = lock.lock().await;

        let mut state = self.store.load(&instrument.id);
        let reply = match mutate(instrument, &mut state, &self.settings.currency_symbol) {
            Ok(reply) => reply,
            Err(e) => return format!("{instrument}: {e}"),
        };

        match self.store.save(&instrument.id, &state) {
            Ok(()) => {
                info!(instrument = %instrument.id, "Operator update saved");
                reply
            }
            Err(e) => {
                error!(instrument = %instrument.id, error = %format!("{e:#}"), "Failed to save operator update");
                format!("{instrument}: failed to save the change ({e}).")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
