//! Persistence layer.
//!
//! One JSON file per instrument (`state_<ticker>.json`, dots replaced by
//! underscores). Loading never fails: a missing file is a first run and an
//! unreadable one is treated as corrupt, and both yield a fresh record.
//! Saving surfaces I/O errors to the caller.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::InstrumentState;

/// Abstraction over per-instrument state persistence.
pub trait StateStore: Send + Sync {
    /// Load the record for `instrument_id`, or a fresh default.
    fn load(&self, instrument_id: &str) -> InstrumentState;

    /// Persist the record for `instrument_id`.
    fn save(&self, instrument_id: &str, state: &InstrumentState) -> Result<()>;
}

/// JSON-file backed state store.
pub struct JsonStateStore {
    dir: PathBuf,
    base_threshold: Decimal,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>, base_threshold: Decimal) -> Self {
        Self {
            dir: dir.into(),
            base_threshold,
        }
    }

    /// File path for an instrument's state.
    pub fn path_for(&self, instrument_id: &str) -> PathBuf {
        self.dir
            .join(format!("state_{}.json", instrument_id.replace('.', "_")))
    }

    fn read(&self, path: &Path) -> Result<InstrumentState> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state from {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse state from {}", path.display()))?;

        // Missing keys default per-field; the threshold defaults to this
        // store's base rather than the compiled-in one.
        let has_threshold = value.get("threshold_pct").is_some();
        let mut state: InstrumentState = serde_json::from_value(value)
            .with_context(|| format!("Failed to parse state from {}", path.display()))?;
        if !has_threshold {
            state.threshold_pct = self.base_threshold;
        }
        Ok(state)
    }
}

impl StateStore for JsonStateStore {
    fn load(&self, instrument_id: &str) -> InstrumentState {
        let path = self.path_for(instrument_id);

        if !path.exists() {
            info!(instrument = instrument_id, path = %path.display(), "No saved state, first run");
            return InstrumentState::new(self.base_threshold);
        }

        let mut state = match self.read(&path) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    instrument = instrument_id,
                    path = %path.display(),
                    error = %format!("{e:#}"),
                    "Corrupt state file, starting fresh"
                );
                return InstrumentState::new(self.base_threshold);
            }
        };

        for repair in state.repair(self.base_threshold) {
            warn!(instrument = instrument_id, repair, "Repaired inconsistent state");
        }

        state
    }

    fn save(&self, instrument_id: &str, state: &InstrumentState) -> Result<()> {
        let path = self.path_for(instrument_id);
        let json = serde_json::to_string_pretty(state)
            .context("Failed to serialise instrument state")?;

        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write state to {}", path.display()))?;

        debug!(instrument = instrument_id, path = %path.display(), "State saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
