//! Configuration loading, overrides and validation.

pub mod bootstrap;
pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

use tracing::warn;

use crate::common::error::ConfigError;

pub use parser::load_config;
pub use types::*;

/// Load the config file, apply environment overrides and validate.
///
/// A missing file is replaced with the default template and reported as
/// [`ConfigError::Bootstrapped`] so the operator can fill in the token.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        bootstrap::write_default_config(path)?;
        return Err(ConfigError::Bootstrapped {
            path: path.display().to_string(),
        });
    }

    for var in env::check_empty_env_vars() {
        warn!("Environment variable {} is set but empty", var);
    }

    let config = env::apply_env_overrides(load_config(path)?);
    validate::validate_config(&config)?;
    Ok(config)
}
