//! Core engine: the per-instrument evaluate → notify → confirm loop.
//!
//! `SignalEngine` owns the collaborators and one mutex per instrument.
//! Every load-modify-save sequence on an instrument's record runs under
//! that instrument's mutex. Scheduled evaluations only `try_lock` it, so an
//! overrunning pass never re-enters an instrument; operator-driven paths
//! (confirmations, commands) wait for it.

pub mod confirm;
pub mod control;
pub mod cycle;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::data::MarketDataProvider;
use crate::notify::Notifier;
use crate::storage::StateStore;
use crate::strategy::ThresholdConfig;
use crate::types::{Instrument, SentinelError};

pub use cycle::{CycleOutcome, PassReport};

/// Tunables the engine needs at runtime (overridden by config.toml).
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub threshold: ThresholdConfig,
    /// Threshold used by `/probe` when none is given.
    pub probe_default: Decimal,
    pub currency_symbol: String,
    /// Only used for operator-facing text.
    pub scan_interval_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            threshold: ThresholdConfig::default(),
            probe_default: dec!(0.001),
            currency_symbol: "£".to_string(),
            scan_interval_secs: 300,
        }
    }
}

pub struct SignalEngine {
    instruments: Vec<Instrument>,
    store: Arc<dyn StateStore>,
    market_data: Arc<dyn MarketDataProvider>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
    locks: HashMap<String, Arc<Mutex<()>>>,
}

impl SignalEngine {
    pub fn new(
        instruments: Vec<Instrument>,
        store: Arc<dyn StateStore>,
        market_data: Arc<dyn MarketDataProvider>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Self {
        let locks = instruments
            .iter()
            .map(|i| (i.id.clone(), Arc::new(Mutex::new(()))))
            .collect();

        Self {
            instruments,
            store,
            market_data,
            notifier,
            settings,
            locks,
        }
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Look up a tracked instrument by id (case-insensitive).
    pub fn instrument(&self, id: &str) -> Result<&Instrument, SentinelError> {
        self.instruments
            .iter()
            .find(|i| i.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| SentinelError::UnknownInstrument(id.to_string()))
    }

    fn lock_for(&self, instrument: &Instrument) -> Arc<Mutex<()>> {
        // Every tracked instrument gets a lock in `new`; the fallback only
        // covers instruments constructed outside the engine.
        self.locks
            .get(&instrument.id)
            .cloned()
            .unwrap_or_else(|| Arc::new(Mutex::new(())))
    }

    fn unknown_instrument_text(&self) -> String {
        let ids: Vec<&str> = self.instruments.iter().map(|i| i.id.as_str()).collect();
        format!("Unknown ticker. Use one of: {}", ids.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------
