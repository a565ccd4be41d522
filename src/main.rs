//! Tagrelay - Telegram mention relay bot
//!
//! Users register their @username with the bot in a private chat; whenever
//! a group message mentions them, the bot forwards it to that private chat.

mod common;
mod config;
mod relay;
mod store;
mod telegram;

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn};

use config::{env::get_config_path, load_and_validate};
use store::RegistrationStore;
use telegram::{StopReason, TelegramBotBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Tagrelay v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Database: {}", config.database.path);
    info!("  Poll timeout: {}s", config.telegram.poll_timeout_secs);

    // Open the registration store
    let store = Arc::new(RegistrationStore::open(&config.database.path).map_err(|e| {
        error!("Failed to open registration store: {}", e);
        e
    })?);
    info!("  Registrations: {}", store.count()?);

    let bot = TelegramBotBuilder::new(config.telegram.clone(), Arc::clone(&store))
        .build()
        .await?;

    let reason = bot.run(shutdown_signal()).await;

    // Every other handle was dropped with the dispatcher.
    match Arc::try_unwrap(store) {
        Ok(store) => {
            if let Err(e) = store.close() {
                error!("Failed to close registration store: {}", e);
            }
        }
        Err(_) => warn!("Registration store still in use, closing on drop"),
    }

    if reason == StopReason::StoreFailure {
        anyhow::bail!("Registration store became unusable");
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
