//! State file behaviour across restarts.

use rust_decimal_macros::dec;

use sentinel::storage::{JsonStateStore, StateStore};
use sentinel::types::{Action, InstrumentState};

#[test]
fn test_state_survives_restart() {
    let dir = std::env::temp_dir().join(format!("sentinel_it_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut state = InstrumentState::default();
    state.last_buy_price = Some(dec!(25.1234));
    state.pending_order = Some(Action::Sell);
    state.pending_price = Some(dec!(24.5));
    state.holding_value = dec!(1200);
    state.probe_mode = true;
    state.probe_original_threshold = Some(dec!(0.03));
    state.threshold_pct = dec!(0.001);

    JsonStateStore::new(&dir, dec!(0.02)).save("PHPT.L", &state).unwrap();

    // A fresh store instance stands in for a process restart.
    let restored = JsonStateStore::new(&dir, dec!(0.02)).load("PHPT.L");
    assert_eq!(restored, state);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_corrupt_file_starts_fresh() {
    let dir = std::env::temp_dir().join(format!("sentinel_it_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("state_NGAS_L.json"), "{ not json").unwrap();

    let state = JsonStateStore::new(&dir, dec!(0.02)).load("NGAS.L");
    assert_eq!(state, InstrumentState::new(dec!(0.02)));

    std::fs::remove_dir_all(&dir).ok();
}
