//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `TAGRELAY_TELEGRAM_TOKEN` - Telegram bot token
//! - `TAGRELAY_DATABASE_PATH` - SQLite database file
//! - `TAGRELAY_POLL_TIMEOUT_SECS` - Long-polling timeout
//! - `TAGRELAY_CONFIG` - Config file location (see [`get_config_path`])

use std::env;

use tracing::warn;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "TAGRELAY";

/// Apply environment variable overrides to a config.
///
/// This allows the bot token to be provided via the environment instead of
/// sitting in the config file.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides_from(config, |key| env::var(key).ok())
}

/// Apply overrides using `lookup` to read variables.
fn apply_overrides_from<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(&format!("{}_TELEGRAM_TOKEN", ENV_PREFIX)) {
        config.telegram.token = token;
    }

    if let Some(path) = lookup(&format!("{}_DATABASE_PATH", ENV_PREFIX)) {
        config.database.path = path;
    }

    let timeout_var = format!("{}_POLL_TIMEOUT_SECS", ENV_PREFIX);
    if let Some(timeout) = lookup(&timeout_var) {
        match timeout.parse() {
            Ok(secs) => config.telegram.poll_timeout_secs = secs,
            Err(e) => warn!("Ignoring {}='{}': {}", timeout_var, timeout, e),
        }
    }

    config
}

/// Check if any override variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_TELEGRAM_TOKEN", ENV_PREFIX),
        format!("{}_DATABASE_PATH", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `TAGRELAY_CONFIG` environment variable, otherwise returns "tagrelay.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "tagrelay.conf".to_string())
}
