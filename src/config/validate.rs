//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::{Config, PLACEHOLDER_TOKEN};

/// Telegram refuses long-polling timeouts above this.
const MAX_POLL_TIMEOUT_SECS: u32 = 50;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    let token = config.telegram.token.trim();
    if token.is_empty() {
        errors.push("telegram.token is required".to_string());
    } else if token == PLACEHOLDER_TOKEN {
        errors.push("telegram.token has not been configured (still using placeholder)".to_string());
    } else if !has_token_shape(token) {
        errors.push("telegram.token must look like '<bot id>:<secret>'".to_string());
    }

    let timeout = config.telegram.poll_timeout_secs;
    if timeout == 0 || timeout > MAX_POLL_TIMEOUT_SECS {
        errors.push(format!(
            "telegram.poll_timeout_secs must be 1-{} (got {})",
            MAX_POLL_TIMEOUT_SECS, timeout
        ));
    }

    if config.database.path.trim().is_empty() {
        errors.push("database.path is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

/// Bot tokens are `<numeric bot id>:<secret>`.
fn has_token_shape(token: &str) -> bool {
    match token.split_once(':') {
        Some((id, secret)) => {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_valid_config() -> Config {
        let mut config = Config::default();
        config.telegram.token = "123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_token_fails() {
        let mut config = make_valid_config();
        config.telegram.token = String::new();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("telegram.token"));
    }

    #[test]
    fn test_placeholder_token_fails() {
        let config = Config::default();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("placeholder"));
    }

    #[test]
    fn test_malformed_token_fails() {
        let mut config = make_valid_config();
        config.telegram.token = "not-a-token".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("<bot id>:<secret>"));
    }

    #[test]
    fn test_poll_timeout_bounds() {
        let mut config = make_valid_config();
        config.telegram.poll_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        config.telegram.poll_timeout_secs = 51;
        assert!(validate_config(&config).is_err());

        config.telegram.poll_timeout_secs = 50;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = Config::default();
        config.database.path = "  ".to_string();

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("placeholder"));
        assert!(message.contains("database.path"));
    }
}
