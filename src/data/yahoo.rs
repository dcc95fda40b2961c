//! Yahoo Finance market data provider.
//!
//! Pulls daily closes from the public chart endpoint and derives the
//! current price (last close) and volatility (sample standard deviation of
//! daily percentage returns over the window).
//!
//! API: `https://query1.finance.yahoo.com/v8/finance/chart/{ticker}`
//! Auth: none.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::*;
use serde::Deserialize;
use tracing::debug;

use super::MarketDataProvider;
use crate::types::{Instrument, Quote, SentinelError};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct YahooFinanceProvider {
    http: Client,
    base_url: String,
    lookback_days: u32,
}

impl YahooFinanceProvider {
    pub fn new(lookback_days: u32, timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(BASE_URL, lookback_days, timeout_secs)
    }

    pub fn with_base_url(base_url: &str, lookback_days: u32, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("SENTINEL/0.1.0")
            .build()
            .context("Failed to build market data HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            lookback_days,
        })
    }

    async fn fetch_closes(&self, ticker: &str) -> Result<Vec<f64>> {
        let url = format!(
            "{}/{}?range={}d&interval=1d",
            self.base_url,
            urlencoding::encode(ticker),
            self.lookback_days,
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Chart request failed for {ticker}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Chart API error for {ticker}: {status}");
        }

        let data: ChartResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse chart response for {ticker}"))?;

        Ok(extract_closes(data))
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    async fn fetch(&self, instrument: &Instrument) -> Result<Quote> {
        let closes = self
            .fetch_closes(&instrument.id)
            .await
            .map_err(|e| SentinelError::DataUnavailable {
                instrument: instrument.id.clone(),
                reason: format!("{e:#}"),
            })?;

        let quote = quote_from_closes(&closes).ok_or_else(|| SentinelError::DataUnavailable {
            instrument: instrument.id.clone(),
            reason: "no closing prices in window".to_string(),
        })?;

        debug!(
            instrument = %instrument.id,
            closes = closes.len(),
            price = %quote.price,
            volatility = ?quote.volatility,
            "Quote fetched"
        );
        Ok(quote)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

// ---------------------------------------------------------------------------
// Calculations
// ---------------------------------------------------------------------------

fn extract_closes(data: ChartResponse) -> Vec<f64> {
    data.chart
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|r| r.indicators.quote.into_iter().next())
        .map(|q| q.close.into_iter().flatten().collect())
        .unwrap_or_default()
}

/// Build a quote from daily closes (oldest first).
///
/// Returns `None` when there are no closes. Volatility needs at least two
/// daily returns, so at least three closes.
fn quote_from_closes(closes: &[f64]) -> Option<Quote> {
    let last = *closes.last()?;
    let price = to_decimal(last)?;
    let volatility = daily_volatility(closes).and_then(to_decimal);
    Some(Quote { price, volatility })
}

/// Sample standard deviation (n-1) of daily percentage returns.
///
/// Undefined for fewer than two returns.
fn daily_volatility(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();

    match returns.len() {
        0 | 1 => None,
        n => {
            let mean = returns.iter().sum::<f64>() / n as f64;
            let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            Some(var.sqrt())
        }
    }
}

fn to_decimal(v: f64) -> Option<Decimal> {
    if !v.is_finite() {
        return None;
    }
    Decimal::from_f64(v).map(|d| d.round_dp(8).normalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
