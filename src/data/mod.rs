//! Market data providers.
//!
//! Defines the `MarketDataProvider` trait. A provider returns the current
//! price and, when enough history exists, a daily volatility estimate.

pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Instrument, Quote};

/// Abstraction over market-data sources.
///
/// Implementors fail with `SentinelError::DataUnavailable` when no recent
/// quote exists; callers skip the instrument for that cycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the latest price and volatility for an instrument.
    async fn fetch(&self, instrument: &Instrument) -> Result<Quote>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
