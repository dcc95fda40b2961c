//! Deterministic in-memory collaborators for integration testing.
//!
//! Prices, failures and sent messages are fully controllable from test
//! code; nothing touches the network.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sentinel::data::MarketDataProvider;
use sentinel::engine::{EngineSettings, SignalEngine};
use sentinel::notify::{Choice, Notifier};
use sentinel::storage::StateStore;
use sentinel::types::{Instrument, Quote};

/// A market whose quotes are set by the test.
#[derive(Default)]
pub struct MockMarket {
    quotes: Mutex<HashMap<String, Quote>>,
}

impl MockMarket {
    pub fn set(&self, id: &str, price: Decimal, volatility: Option<Decimal>) {
        self.quotes
            .lock()
            .unwrap()
            .insert(id.to_string(), Quote { price, volatility });
    }

    pub fn clear(&self, id: &str) {
        self.quotes.lock().unwrap().remove(id);
    }
}

#[async_trait]
impl MarketDataProvider for MockMarket {
    async fn fetch(&self, instrument: &Instrument) -> Result<Quote> {
        self.quotes
            .lock()
            .unwrap()
            .get(&instrument.id)
            .cloned()
            .ok_or_else(|| anyhow!("no quote for {}", instrument.id))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Records messages; the last set of choices stands in for the buttons
/// the operator would press.
#[derive(Default)]
pub struct MockOperator {
    sent: Mutex<Vec<(String, Vec<Choice>)>>,
}

impl MockOperator {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Token of the choice labelled `label` in the most recent message.
    pub fn last_token(&self, label: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .and_then(|(_, choices)| choices.iter().find(|c| c.label == label))
            .map(|c| c.token.clone())
    }
}

#[async_trait]
impl Notifier for MockOperator {
    async fn notify(&self, text: &str, choices: Option<&[Choice]>) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((text.to_string(), choices.map(|c| c.to_vec()).unwrap_or_default()));
        Ok(())
    }
}

pub fn gold() -> Instrument {
    Instrument::new("SGLN.L", "Gold")
}

pub fn oil() -> Instrument {
    Instrument::new("BRNT.L", "Oil")
}

pub struct Harness {
    pub engine: SignalEngine,
    pub market: Arc<MockMarket>,
    pub operator: Arc<MockOperator>,
}

pub fn harness(store: Arc<dyn StateStore>) -> Harness {
    let market = Arc::new(MockMarket::default());
    let operator = Arc::new(MockOperator::default());
    let engine = SignalEngine::new(
        vec![gold(), oil()],
        store,
        market.clone(),
        operator.clone(),
        EngineSettings::default(),
    );
    Harness {
        engine,
        market,
        operator,
    }
}
