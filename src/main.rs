mod bot;
mod config;
mod memory;
mod platform;
mod relay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Environment overrides may live in a .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,giftwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Channels: {:?}", config.relay.channels);
    info!("  Keywords: {}", config.keywords().len());
    match config.destination() {
        Some(id) => info!("  Destination: {}", id),
        None => info!("  Destination: not set, send /start to the bot to get your chat ID"),
    }
    info!("  State file: {}", config.relay.state_path.display());

    let state = Arc::new(AppState::new(config).await?);

    info!("Bot is starting...");
    bot::run(state).await?;

    Ok(())
}
