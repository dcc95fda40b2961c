//! SENTINEL: volatility-adaptive buy/sell signal agent
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the state store, market data and operator channel into the
//! engine, and runs the scheduled evaluation loop with graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use sentinel::config;
use sentinel::dashboard;
use sentinel::data::yahoo::YahooFinanceProvider;
use sentinel::data::MarketDataProvider;
use sentinel::engine::SignalEngine;
use sentinel::notify::telegram::{self, TelegramConfig, TelegramNotifier};
use sentinel::notify::{LogNotifier, Notifier};
use sentinel::storage::JsonStateStore;

const BANNER: &str = r#"
 ____  _____ _   _ _____ ___ _   _ _____ _
/ ___|| ____| \ | |_   _|_ _| \ | | ____| |
\___ \|  _| |  \| | | |  | ||  \| |  _| | |
 ___) | |___| |\  | | |  | || |\  | |___| |___
|____/|_____|_| \_| |_| |___|_| \_|_____|_____|

  Volatility-adaptive buy/sell signals with operator confirmation
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        scan_interval_secs = cfg.agent.scan_interval_secs,
        instruments = cfg.instruments.len(),
        base_threshold = %cfg.threshold.base,
        state_dir = %cfg.agent.state_dir,
        "SENTINEL starting up"
    );

    // -- Initialise components -------------------------------------------

    let store = Arc::new(JsonStateStore::new(&cfg.agent.state_dir, cfg.threshold.base));

    let market_data = Arc::new(YahooFinanceProvider::new(
        cfg.market_data.lookback_days,
        cfg.market_data.timeout_secs,
    )?);
    info!(provider = market_data.name(), "Market data provider ready");

    let telegram_cfg =
        TelegramConfig::from_env(&cfg.telegram.bot_token_env, &cfg.telegram.chat_id_env);

    let notifier: Arc<dyn Notifier> = match &telegram_cfg {
        Some(tg) => {
            info!(chat_id = tg.chat_id, "Using Telegram operator channel");
            Arc::new(TelegramNotifier::new(tg.bot(), tg.chat_id))
        }
        None => {
            warn!(
                token_env = %cfg.telegram.bot_token_env,
                chat_env = %cfg.telegram.chat_id_env,
                "No Telegram credentials; signals will only be logged"
            );
            Arc::new(LogNotifier)
        }
    };

    let engine = Arc::new(SignalEngine::new(
        cfg.instruments.clone(),
        store,
        market_data,
        notifier,
        cfg.engine_settings(),
    ));

    if let Some(tg) = &telegram_cfg {
        tokio::spawn(telegram::run_dispatcher(tg.bot(), tg.chat_id, engine.clone()));
    }

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(engine.clone(), cfg.dashboard.port).await?;
    }

    // -- Main loop -------------------------------------------------------

    let period = Duration::from_secs(cfg.agent.scan_interval_secs);
    let first_run = Instant::now() + Duration::from_secs(cfg.agent.first_run_delay_secs);
    let mut interval = tokio::time::interval_at(first_run, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.agent.scan_interval_secs,
        first_run_delay_secs = cfg.agent.first_run_delay_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Passes are paced by the timer, not by completion; an
                // instrument still busy from the last pass is skipped.
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.run_pass().await;
                });
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("SENTINEL shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sentinel=info"));

    let json_logging = std::env::var("SENTINEL_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
