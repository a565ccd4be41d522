//! Telegram bot client.
//!
//! Builds the teloxide bot, resolves the bot's own identity, and runs the
//! long-polling dispatcher that feeds every message to the [`Relay`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::Update;
use teloxide::update_listeners::Polling;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::error::{Result, TransportError, TransportResult};
use crate::config::types::TelegramConfig;
use crate::relay::{ChatTransport, Relay};
use crate::store::RegistrationStore;
use crate::telegram::adapter::{message_context, TelegramTransport};

/// Added to the poll timeout so the HTTP client never gives up on a long poll
/// before Telegram answers it.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// How the polling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT/SIGTERM, or the dispatcher stopped on its own.
    Signal,
    /// The registration store became unusable.
    StoreFailure,
}

/// Builder for creating the Telegram bot.
pub struct TelegramBotBuilder {
    config: TelegramConfig,
    store: Arc<RegistrationStore>,
}

impl TelegramBotBuilder {
    pub fn new(config: TelegramConfig, store: Arc<RegistrationStore>) -> Self {
        Self { config, store }
    }

    /// Build the bot and resolve its identity.
    ///
    /// `getMe` is retried with backoff while Telegram is unreachable; an
    /// invalid token fails immediately.
    pub async fn build(self) -> Result<TelegramBot> {
        let bot = build_bot(&self.config)?;
        let transport = TelegramTransport::new(bot.clone());

        info!("Verifying bot token...");
        let identity = (|| async { transport.get_self_identity().await })
            .retry(startup_backoff())
            .when(|e: &TransportError| e.is_transient())
            .notify(|e: &TransportError, delay: Duration| {
                warn!(
                    "Telegram unreachable ({}). Retrying in {:.1}s...",
                    e,
                    delay.as_secs_f64()
                );
            })
            .await
            .map_err(|e| {
                error!("Failed to authenticate bot: {}", e);
                e
            })?;

        info!("Bot authenticated: @{} (ID: {})", identity.username, identity.user_id);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay = Arc::new(Relay::new(self.store, identity, shutdown_tx));

        Ok(TelegramBot {
            bot,
            relay,
            shutdown_rx,
            poll_timeout: Duration::from_secs(u64::from(self.config.poll_timeout_secs)),
        })
    }
}

fn build_bot(config: &TelegramConfig) -> TransportResult<Bot> {
    let poll_timeout = Duration::from_secs(u64::from(config.poll_timeout_secs));

    // Build a custom reqwest client with timeout settings
    let client = teloxide::net::default_reqwest_settings()
        .timeout(poll_timeout + HTTP_TIMEOUT_MARGIN)
        .build()
        .map_err(|e| TransportError::ClientBuild {
            message: e.to_string(),
        })?;

    Ok(Bot::with_client(config.token.clone(), client))
}

/// Exponential backoff for startup: 1s initial, 1min max, with jitter,
/// 8 attempts.
fn startup_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(60))
        .with_jitter()
        .with_max_times(8)
}

pub struct TelegramBot {
    bot: Bot,
    relay: Arc<Relay>,
    shutdown_rx: watch::Receiver<bool>,
    poll_timeout: Duration,
}

impl TelegramBot {
    /// Poll for updates until `shutdown` resolves or the store fails.
    pub async fn run<S>(self, shutdown: S) -> StopReason
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let handler = Update::filter_message().endpoint(handle_message);

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![Arc::clone(&self.relay)])
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd.kind);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "Error in message handler",
            ))
            .build();

        let token = dispatcher.shutdown_token();
        let mut store_failed_rx = self.shutdown_rx.clone();

        let stopper = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown => info!("Shutdown signal received - stopping polling..."),
                _ = wait_for_flag(&mut store_failed_rx) => {
                    error!("Registration store failed - stopping polling...")
                }
            }

            // The token refuses to fire until the dispatcher is running.
            loop {
                match token.shutdown() {
                    Ok(stopped) => {
                        stopped.await;
                        break;
                    }
                    Err(_) => sleep(Duration::from_millis(100)).await,
                }
            }
        });

        let listener = Polling::builder(self.bot.clone())
            .timeout(self.poll_timeout)
            .build();

        info!(
            "Starting dispatcher with long polling as @{}...",
            self.relay.identity().username
        );
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("Error while polling for updates"),
            )
            .await;
        stopper.abort();
        info!("Dispatcher stopped");

        if *self.shutdown_rx.borrow() {
            StopReason::StoreFailure
        } else {
            StopReason::Signal
        }
    }
}

/// Resolve once the watched flag turns true; never if the sender goes away.
async fn wait_for_flag(rx: &mut watch::Receiver<bool>) {
    let raised = rx.wait_for(|failed| *failed).await.is_ok();
    if !raised {
        std::future::pending::<()>().await;
    }
}

/// Dispatcher endpoint for every message update.
async fn handle_message(bot: Bot, msg: Message, relay: Arc<Relay>) -> ResponseResult<()> {
    let transport = TelegramTransport::new(bot);
    let ctx = message_context(&msg);
    relay.process(&transport, &ctx).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_bot_offline() {
        let config = TelegramConfig {
            token: "123456:test-token".to_string(),
            poll_timeout_secs: 50,
        };
        let bot = build_bot(&config).unwrap();
        assert_eq!(bot.token(), "123456:test-token");
    }

    #[test]
    fn test_flag_wait_returns_once_raised() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        tokio_test::block_on(wait_for_flag(&mut rx));
        assert!(*rx.borrow());
    }

    #[test]
    fn test_startup_backoff_is_bounded() {
        use backon::BackoffBuilder;

        let delays: Vec<Duration> = startup_backoff().build().collect();
        assert_eq!(delays.len(), 8);
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(120)));
    }
}
