//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Token written into a freshly bootstrapped config file.
pub const PLACEHOLDER_TOKEN: &str = "YOUR-API-KEY-HERE";

/// Default SQLite database location.
pub const DEFAULT_DATABASE_PATH: &str = "tagrelay.sqlite3";

/// Default long-polling timeout in seconds.
pub const DEFAULT_POLL_TIMEOUT_SECS: u32 = 30;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot API token issued by @BotFather.
    pub token: String,
    /// Long-polling timeout for `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u32,
}

/// Registration database settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for Config {
    /// The template written on first start.
    fn default() -> Self {
        Self {
            telegram: TelegramConfig {
                token: PLACEHOLDER_TOKEN.to_string(),
                poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            },
            database: DatabaseConfig::default(),
        }
    }
}

fn default_poll_timeout() -> u32 {
    DEFAULT_POLL_TIMEOUT_SECS
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}
