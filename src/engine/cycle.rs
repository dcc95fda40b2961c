//! Scheduled evaluation pass.
//!
//! Instruments are evaluated strictly one after another. Each instrument
//! does load → fetch → threshold → detect → (maybe open + notify) → save.
//! A failure in one instrument never stops the pass.

use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::SignalEngine;
use crate::notify::{confirmation_choices, format};
use crate::strategy::{self, Signal};
use crate::types::{Action, Instrument};

/// What happened to one instrument in a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A previous evaluation of this instrument is still running.
    Busy,
    /// No quote this cycle; state left as it was.
    NoData,
    Evaluated {
        price: Decimal,
        threshold: Decimal,
        signal: Signal,
        /// Whether the operator was asked to confirm a new pending order.
        notified: bool,
    },
}

/// Summary of one full pass over the instrument set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub evaluated: usize,
    pub signals: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SignalEngine {
    /// Evaluate every tracked instrument once, in order.
    pub async fn run_pass(&self) -> PassReport {
        let mut report = PassReport::default();

        for instrument in &self.instruments {
            match self.evaluate_instrument(instrument).await {
                Ok(CycleOutcome::Evaluated { notified, .. }) => {
                    report.evaluated += 1;
                    if notified {
                        report.signals += 1;
                    }
                }
                Ok(CycleOutcome::Busy) | Ok(CycleOutcome::NoData) => report.skipped += 1,
                Err(e) => {
                    error!(instrument = %instrument.id, error = %format!("{e:#}"), "Error checking instrument");
                    report.failed += 1;
                }
            }
        }

        info!(
            evaluated = report.evaluated,
            signals = report.signals,
            skipped = report.skipped,
            failed = report.failed,
            "Pass complete"
        );
        report
    }

    /// Run one evaluation cycle for a single instrument.
    ///
    /// Returns `Busy` without touching anything if another evaluation or an
    /// operator action holds the instrument. Errors only on a failed save.
    pub async fn evaluate_instrument(&self, instrument: &Instrument) -> Result<CycleOutcome> {
        let lock = self.lock_for(instrument);
        let Ok(_guard) = lock.try_lock() else {
            warn!(instrument = %instrument.id, "Previous evaluation still running, skipping");
            return Ok(CycleOutcome::Busy);
        };

        let mut state = self.store.load(&instrument.id);

        let quote = match self.market_data.fetch(instrument).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(instrument = %instrument.id, error = %format!("{e:#}"), "No price data, skipping");
                return Ok(CycleOutcome::NoData);
            }
        };

        // A running probe pins the threshold until the next resolution.
        let threshold = if state.probe_mode {
            state.threshold_pct
        } else {
            let adapted = self.settings.threshold.adapt(quote.volatility);
            state.threshold_pct = adapted;
            adapted
        };
        state.last_price = Some(quote.price);
        state.last_volatility = quote.volatility;
        state.last_updated = Some(Utc::now());

        info!(
            instrument = %instrument.id,
            price = %quote.price,
            last_buy = ?state.last_buy_price,
            last_sell = ?state.last_sell_price,
            threshold = %threshold,
            volatility = ?quote.volatility,
            pending = ?state.pending_order,
            probe = state.probe_mode,
            "Checking {}", instrument.name
        );

        let signal = strategy::evaluate(&mut state, quote.price, threshold)?;
        let action = match signal {
            Signal::NoSignal => None,
            Signal::Buy { .. } => Some(Action::Buy),
            Signal::Sell { .. } => Some(Action::Sell),
        };
        let alert = format::signal_message(
            instrument,
            &state,
            &signal,
            threshold,
            &self.settings.currency_symbol,
        );

        let mut notified = false;
        if let (Some(action), Some(text)) = (action, alert) {
            match strategy::open(&mut state, action, quote.price) {
                Ok(()) => {
                    notified = self.send_alert(instrument, action, quote.price, &text).await;
                    if !notified {
                        // Unsent: drop the pending order so the signal re-fires next cycle.
                        state.pending_order = None;
                        state.pending_price = None;
                    }
                }
                Err(e) => {
                    warn!(instrument = %instrument.id, error = %e, "Signal not opened");
                }
            }
        }

        self.store.save(&instrument.id, &state)?;

        Ok(CycleOutcome::Evaluated {
            price: quote.price,
            threshold,
            signal,
            notified,
        })
    }

    /// Ask the operator to confirm a freshly opened order.
    async fn send_alert(&self, instrument: &Instrument, action: Action, price: Decimal, text: &str) -> bool {
        let choices = confirmation_choices(action, &instrument.id);
        match self.notifier.notify(text, Some(&choices)).await {
            Ok(()) => {
                info!(instrument = %instrument.id, action = %action, price = %price, "Signal sent for confirmation");
                true
            }
            Err(e) => {
                error!(instrument = %instrument.id, error = %format!("{e:#}"), "Failed to send signal alert");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::testkit::*;
    use super::*;
    use crate::data::MockMarketDataProvider;
    use crate::types::InstrumentState;
    use rust_decimal_macros::dec;

    fn anchored_sell(price: Decimal) -> InstrumentState {
        let mut state = InstrumentState::default();
        state.last_sell_price = Some(price);
        state
    }

    #[tokio::test]
    async fn test_first_run_creates_state_without_signal() {
        let (engine, store, notifier) = engine(vec![gold()], quotes(&[("SGLN.L", dec!(100), None)]));

        let outcome = engine.evaluate_instrument(&gold()).await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Evaluated {
                price: dec!(100),
                threshold: dec!(0.02),
                signal: Signal::NoSignal,
                notified: false,
            }
        );

        let state = store.get("SGLN.L").unwrap();
        assert_eq!(state.last_price, Some(dec!(100)));
        assert!(state.last_updated.is_some());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_buy_signal_opens_pending_and_notifies() {
        let (engine, store, notifier) =
            engine(vec![gold()], quotes(&[("SGLN.L", dec!(102.5), Some(dec!(0.02)))]));
        store.put("SGLN.L", anchored_sell(dec!(100)));

        let outcome = engine.evaluate_instrument(&gold()).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Evaluated { notified: true, .. }));

        let state = store.get("SGLN.L").unwrap();
        assert_eq!(state.pending_order, Some(Action::Buy));
        assert_eq!(state.pending_price, Some(dec!(102.5)));
        assert_eq!(state.buy_trigger, Some(dec!(102.00)));

        let sent = notifier.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("BUY signal"));
        assert_eq!(sent[0].1[0].token, "CONFIRM|BUY|SGLN.L|YES");
        assert_eq!(sent[0].1[1].token, "CONFIRM|BUY|SGLN.L|NO");
    }

    #[tokio::test]
    async fn test_pending_order_blocks_second_signal() {
        let (engine, store, notifier) = engine(vec![gold()], quotes(&[("SGLN.L", dec!(105), None)]));
        store.put("SGLN.L", anchored_sell(dec!(100)));

        engine.evaluate_instrument(&gold()).await.unwrap();
        let outcome = engine.evaluate_instrument(&gold()).await.unwrap();

        assert!(matches!(
            outcome,
            CycleOutcome::Evaluated {
                signal: Signal::NoSignal,
                notified: false,
                ..
            }
        ));
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(store.get("SGLN.L").unwrap().pending_price, Some(dec!(105)));
    }

    #[tokio::test]
    async fn test_volatility_adapts_threshold() {
        let (engine, store, _) =
            engine(vec![gold()], quotes(&[("SGLN.L", dec!(100), Some(dec!(0.05)))]));

        engine.evaluate_instrument(&gold()).await.unwrap();
        let state = store.get("SGLN.L").unwrap();
        assert_eq!(state.threshold_pct, dec!(0.03));
        assert_eq!(state.last_volatility, Some(dec!(0.05)));
    }

    #[tokio::test]
    async fn test_probe_threshold_not_overwritten() {
        let (engine, store, notifier) =
            engine(vec![gold()], quotes(&[("SGLN.L", dec!(100.2), Some(dec!(0.05)))]));
        let mut state = anchored_sell(dec!(100));
        strategy::start_probe(&mut state, dec!(0.001)).unwrap();
        store.put("SGLN.L", state);

        let outcome = engine.evaluate_instrument(&gold()).await.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Evaluated {
                notified: true,
                ..
            }
        ));

        let state = store.get("SGLN.L").unwrap();
        assert_eq!(state.threshold_pct, dec!(0.001));
        assert_eq!(state.buy_trigger, Some(dec!(100.100)));
        assert!(notifier.messages()[0].0.contains("Probe cycle"));
    }

    #[tokio::test]
    async fn test_missing_quote_skips_without_saving() {
        let (engine, store, _) = engine(vec![gold()], quotes(&[]));

        let outcome = engine.evaluate_instrument(&gold()).await.unwrap();
        assert_eq!(outcome, CycleOutcome::NoData);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_failure_rolls_back_pending() {
        let (engine, store, notifier) = engine(vec![gold()], quotes(&[("SGLN.L", dec!(103), None)]));
        store.put("SGLN.L", anchored_sell(dec!(100)));
        *notifier.fail.lock().unwrap() = true;

        let outcome = engine.evaluate_instrument(&gold()).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Evaluated { notified: false, .. }));

        let state = store.get("SGLN.L").unwrap();
        assert!(state.pending_order.is_none());
        assert!(state.pending_price.is_none());
        assert_eq!(state.last_price, Some(dec!(103)));
    }

    #[tokio::test]
    async fn test_save_failure_is_surfaced() {
        let (engine, store, _) = engine(vec![gold()], quotes(&[("SGLN.L", dec!(100), None)]));
        *store.fail_saves.lock().unwrap() = true;

        assert!(engine.evaluate_instrument(&gold()).await.is_err());
    }

    #[tokio::test]
    async fn test_busy_instrument_is_skipped() {
        let (engine, store, _) = engine(vec![gold()], MockMarketDataProvider::new());

        let lock = engine.lock_for(&gold());
        let _held = lock.lock().await;

        // The mock has no fetch expectation: reaching it would panic.
        let outcome = engine.evaluate_instrument(&gold()).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Busy);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_pass_continues_after_failures() {
        let (engine, store, notifier) = engine(
            vec![
                Instrument::new("NGAS.L", "Natural Gas"),
                gold(),
                silver(),
            ],
            quotes(&[("SGLN.L", dec!(97.5), None), ("SSLN.L", dec!(25), None)]),
        );
        let mut state = InstrumentState::default();
        state.last_buy_price = Some(dec!(100));
        store.put("SGLN.L", state);

        let report = engine.run_pass().await;
        assert_eq!(
            report,
            PassReport {
                evaluated: 2,
                signals: 1,
                skipped: 1,
                failed: 0,
            }
        );
        assert_eq!(store.get("SGLN.L").unwrap().pending_order, Some(Action::Sell));
        assert!(store.get("SSLN.L").is_some());
        assert!(notifier.messages()[0].0.contains("SELL signal"));
    }

    #[tokio::test]
    async fn test_overflowing_trigger_fails_only_that_instrument() {
        let (engine, store, notifier) = engine(
            vec![gold(), silver()],
            quotes(&[("SGLN.L", dec!(100), None), ("SSLN.L", dec!(25), None)]),
        );
        store.put("SGLN.L", anchored_sell(Decimal::MAX));

        let report = engine.run_pass().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.evaluated, 1);

        // The failing record is not rewritten; the next instrument still runs.
        assert_eq!(store.get("SGLN.L").unwrap().last_price, None);
        assert_eq!(store.get("SSLN.L").unwrap().last_price, Some(dec!(25)));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_pass_counts_save_failures() {
        let (engine, store, _) = engine(
            vec![gold(), silver()],
            quotes(&[("SGLN.L", dec!(100), None), ("SSLN.L", dec!(25), None)]),
        );
        *store.fail_saves.lock().unwrap() = true;

        let report = engine.run_pass().await;
        assert_eq!(report.failed, 2);
        assert_eq!(report.evaluated, 0);
    }
}
