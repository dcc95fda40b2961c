//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the Telegram bot token) are referenced by env-var name in the
//! config and resolved at runtime via `AppConfig::resolve_env`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::engine::EngineSettings;
use crate::strategy::ThresholdConfig;
use crate::types::{is_valid_threshold, Instrument, SentinelError};

/// Instruments tracked when the config lists none.
const DEFAULT_INSTRUMENTS: &[(&str, &str)] = &[
    ("SGLN.L", "Gold"),
    ("SSLN.L", "Silver"),
    ("BRNT.L", "Oil"),
    ("NGAS.L", "Natural Gas"),
    ("COPA.L", "Copper"),
    ("PHPT.L", "Platinum"),
    ("PHPD.L", "Palladium"),
    ("CMOD.L", "Commodities Basket"),
];

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub threshold: ThresholdSection,
    pub market_data: MarketDataConfig,
    pub instruments: Vec<Instrument>,
    pub telegram: TelegramSection,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub scan_interval_secs: u64,
    pub first_run_delay_secs: u64,
    /// Directory holding the per-instrument state files.
    pub state_dir: String,
    pub currency_symbol: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "SENTINEL".to_string(),
            scan_interval_secs: 300,
            first_run_delay_secs: 5,
            state_dir: ".".to_string(),
            currency_symbol: "£".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ThresholdSection {
    pub base: Decimal,
    pub vol_low: Decimal,
    pub vol_high: Decimal,
    /// Threshold used by `/probe` when the operator gives none.
    pub probe_default: Decimal,
}

impl Default for ThresholdSection {
    fn default() -> Self {
        let defaults = ThresholdConfig::default();
        Self {
            base: defaults.base,
            vol_low: defaults.vol_low,
            vol_high: defaults.vol_high,
            probe_default: dec!(0.001),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketDataConfig {
    /// Calendar days of daily closes used for volatility.
    pub lookback_days: u32,
    pub timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            lookback_days: 11,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token_env: String,
    pub chat_id_env: String,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token_env: "BOT_TOKEN".to_string(),
            chat_id_env: "CHAT_ID".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a malformed or invalid one is an
    /// error.
    pub fn load(path: &str) -> Result<Self> {
        let config = if Path::new(path).exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {path}"))?
        } else {
            Self::default().with_default_instruments()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config.with_default_instruments())
    }

    fn with_default_instruments(mut self) -> Self {
        if self.instruments.is_empty() {
            self.instruments = DEFAULT_INSTRUMENTS
                .iter()
                .map(|(id, name)| Instrument::new(id, name))
                .collect();
        }
        self
    }

    /// Reject configurations that would break engine invariants.
    pub fn validate(&self) -> Result<(), SentinelError> {
        let t = &self.threshold;
        if !is_valid_threshold(t.base) {
            return Err(SentinelError::Config(format!(
                "threshold.base must be between 0 and 1, got {}",
                t.base
            )));
        }
        if !is_valid_threshold(t.probe_default) {
            return Err(SentinelError::Config(format!(
                "threshold.probe_default must be between 0 and 1, got {}",
                t.probe_default
            )));
        }
        if t.vol_low > t.vol_high {
            return Err(SentinelError::Config(format!(
                "threshold.vol_low ({}) exceeds vol_high ({})",
                t.vol_low, t.vol_high
            )));
        }
        if self.agent.scan_interval_secs == 0 {
            return Err(SentinelError::Config("agent.scan_interval_secs must be positive".to_string()));
        }
        if self.instruments.is_empty() {
            return Err(SentinelError::Config("no instruments configured".to_string()));
        }

        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if instrument.id.trim().is_empty() {
                return Err(SentinelError::Config("instrument with empty id".to_string()));
            }
            if !seen.insert(instrument.id.to_uppercase()) {
                return Err(SentinelError::Config(format!("duplicate instrument: {}", instrument.id)));
            }
        }
        Ok(())
    }

    pub fn threshold_config(&self) -> ThresholdConfig {
        ThresholdConfig {
            base: self.threshold.base,
            vol_low: self.threshold.vol_low,
            vol_high: self.threshold.vol_high,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            threshold: self.threshold_config(),
            probe_default: self.threshold.probe_default,
            currency_symbol: self.agent.currency_symbol.clone(),
            scan_interval_secs: self.agent.scan_interval_secs,
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
