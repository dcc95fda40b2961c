//! Operator confirmation handling.
//!
//! Confirmations arrive out of band whenever the operator answers. They
//! wait for the instrument's lock rather than skipping, so a response is
//! never dropped because a pass happens to be running.

use tracing::{error, info, warn};

use super::SignalEngine;
use crate::notify::{format, ConfirmationToken};
use crate::strategy;

impl SignalEngine {
    /// Handle raw choice data from the operator. Returns the reply text.
    pub async fn handle_choice(&self, data: &str) -> String {
        match data.parse::<ConfirmationToken>() {
            Ok(token) => self.handle_confirmation(&token).await,
            Err(e) => {
                warn!(data, error = %e, "Invalid confirmation data");
                "Invalid confirmation data.".to_string()
            }
        }
    }

    /// Resolve the instrument's pending order with the operator's answer.
    ///
    /// State is saved only when the resolution succeeds; mismatches and
    /// stale answers leave the record exactly as it was.
    pub async fn handle_confirmation(&self, token: &ConfirmationToken) -> String {
        let Ok(instrument) = self.instrument(&token.instrument_id) else {
            warn!(instrument = %token.instrument_id, "Confirmation for unknown instrument");
            return "Unknown ticker in confirmation.".to_string();
        };

        let lock = self.lock_for(instrument);
        let _guard = lock.lock().await;

        let mut state = self.store.load(&instrument.id);

        let resolution = match strategy::resolve(&mut state, token.action, token.accepted) {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(instrument = %instrument.id, action = %token.action, error = %e, "Confirmation not applied");
                return format::resolution_error_message(instrument, &e);
            }
        };

        let mut text = format::resolution_message(instrument, &resolution, &self.settings.currency_symbol);

        match self.store.save(&instrument.id, &state) {
            Ok(()) => info!(
                instrument = %instrument.id,
                action = %resolution.action,
                accepted = resolution.accepted,
                "Confirmation recorded"
            ),
            Err(e) => {
                error!(instrument = %instrument.id, error = %format!("{e:#}"), "Failed to save confirmation");
                text.push_str("\n\nWarning: the state could not be saved; this answer may be lost.");
            }
        }

        text
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
