//! Signal → confirmation → re-anchor cycles against a file-backed store.

use rust_decimal_macros::dec;
use std::sync::Arc;

use sentinel::engine::CycleOutcome;
use sentinel::notify::command::OperatorCommand;
use sentinel::storage::{JsonStateStore, StateStore};
use sentinel::strategy::Signal;
use sentinel::types::{Action, InstrumentState};

use crate::mocks::{gold, harness, oil};

fn temp_store() -> (Arc<JsonStateStore>, std::path::PathBuf) {
    let dir = std::env::temp_dir().join(format!("sentinel_it_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    (Arc::new(JsonStateStore::new(&dir, dec!(0.02))), dir)
}

#[tokio::test]
async fn test_full_sell_then_buy_cycle() {
    let (store, dir) = temp_store();
    let h = harness(store.clone());

    let mut seeded = InstrumentState::default();
    seeded.last_buy_price = Some(dec!(100));
    store.save("SGLN.L", &seeded).unwrap();

    // Price drops 2.5% below the last buy: SELL fires.
    h.market.set("SGLN.L", dec!(97.5), None);
    let outcome = h.engine.evaluate_instrument(&gold()).await.unwrap();
    assert!(matches!(
        outcome,
        CycleOutcome::Evaluated { signal: Signal::Sell { .. }, notified: true, .. }
    ));
    assert!(h.operator.messages()[0].contains("SELL signal"));

    // Further cycles stay quiet while the order is pending.
    h.market.set("SGLN.L", dec!(90), None);
    h.engine.run_pass().await;
    assert_eq!(h.operator.messages().len(), 1);
    assert_eq!(store.load("SGLN.L").pending_price, Some(dec!(97.5)));

    // Operator confirms.
    let yes = h.operator.last_token("Yes").unwrap();
    assert_eq!(yes, "CONFIRM|SELL|SGLN.L|YES");
    let reply = h.engine.handle_choice(&yes).await;
    assert!(reply.contains("SELL confirmed."));

    let state = store.load("SGLN.L");
    assert_eq!(state.last_sell_price, Some(dec!(97.5)));
    assert_eq!(state.last_buy_price, Some(dec!(100)));
    assert!(!state.has_pending());

    // Price recovers 2% above the sell anchor: BUY fires.
    h.market.set("SGLN.L", dec!(99.45), None);
    let outcome = h.engine.evaluate_instrument(&gold()).await.unwrap();
    assert!(matches!(
        outcome,
        CycleOutcome::Evaluated { signal: Signal::Buy { .. }, notified: true, .. }
    ));

    // A repeated answer after resolution is a no-op.
    h.engine.handle_choice(&h.operator.last_token("Yes").unwrap()).await;
    let again = h.engine.handle_choice("CONFIRM|BUY|SGLN.L|YES").await;
    assert!(again.contains("no pending order found"));
    assert_eq!(store.load("SGLN.L").last_buy_price, Some(dec!(99.45)));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_probe_cycle_restores_threshold() {
    let (store, dir) = temp_store();
    let h = harness(store.clone());

    let mut seeded = InstrumentState::default();
    seeded.last_sell_price = Some(dec!(100));
    store.save("BRNT.L", &seeded).unwrap();

    let reply = h
        .engine
        .execute(OperatorCommand::Probe {
            instrument_id: "BRNT.L".to_string(),
            threshold: None,
        })
        .await;
    assert!(reply.contains("Probe started"));

    // A 0.2% move would never fire at 2%, but does under the probe.
    // High volatility must not override the pinned probe threshold.
    h.market.set("BRNT.L", dec!(100.2), Some(dec!(0.05)));
    let outcome = h.engine.evaluate_instrument(&oil()).await.unwrap();
    match outcome {
        CycleOutcome::Evaluated { threshold, signal, .. } => {
            assert_eq!(threshold, dec!(0.001));
            assert_eq!(signal.action(), Some(Action::Buy));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(h.operator.messages()[0].contains("Probe cycle"));

    let no = h.operator.last_token("No").unwrap();
    let reply = h.engine.handle_choice(&no).await;
    assert!(reply.contains("you chose NO"));
    assert!(reply.contains("Threshold restored to 2.00%."));

    let state = store.load("BRNT.L");
    assert!(!state.probe_mode);
    assert_eq!(state.probe_original_threshold, None);
    assert_eq!(state.threshold_pct, dec!(0.02));
    assert_eq!(state.last_buy_price, None);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_mismatched_answer_leaves_state_untouched() {
    let (store, dir) = temp_store();
    let h = harness(store.clone());

    let mut seeded = InstrumentState::default();
    seeded.last_buy_price = Some(dec!(50));
    seeded.pending_order = Some(Action::Sell);
    seeded.pending_price = Some(dec!(48));
    store.save("BRNT.L", &seeded).unwrap();
    let before = std::fs::read(dir.join("state_BRNT_L.json")).unwrap();

    let reply = h.engine.handle_choice("CONFIRM|BUY|BRNT.L|YES").await;
    assert!(reply.contains("mismatch"));

    let after = std::fs::read(dir.join("state_BRNT_L.json")).unwrap();
    assert_eq!(before, after);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_missing_quote_skips_only_that_instrument() {
    let (store, dir) = temp_store();
    let h = harness(store.clone());

    h.market.set("SGLN.L", dec!(100), Some(dec!(0.005)));
    h.market.clear("BRNT.L");

    let report = h.engine.run_pass().await;
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    // Low volatility tightens the threshold.
    assert_eq!(store.load("SGLN.L").threshold_pct, dec!(0.015));
    assert!(!dir.join("state_BRNT_L.json").exists());

    let status = h.engine.status_report().await;
    assert!(status.contains("Oil (BRNT.L): No price data yet."));

    std::fs::remove_dir_all(&dir).ok();
}
