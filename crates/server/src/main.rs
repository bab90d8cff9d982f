mod assist;
mod bootstrap;
mod health;
mod registry;
mod transport;

use anyhow::Result;
use haulbot_core::config::{AppConfig, LoadOptions};
use haulbot_telegram::poller::{ReconnectPolicy, UpdatePoller};

fn init_logging(config: &AppConfig) {
    use haulbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operation.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let poller = UpdatePoller::new(
        app.transport.clone(),
        app.turn_handler.clone(),
        ReconnectPolicy::default(),
    );

    tracing::info!(event_name = "system.server.started", "haulbot-server started");

    tokio::select! {
        result = poller.start() => {
            result?;
            tracing::info!(event_name = "system.server.poller_stopped", "update poller stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(event_name = "system.server.stopping", "haulbot-server stopping");
        }
    }

    Ok(())
}
