//! First-run configuration template.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Write the default configuration to `path`.
///
/// JSON is a subset of HOCON, so the template loads with the same parser.
pub fn write_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let io_error = |source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    };

    let content = serde_json::to_string_pretty(&Config::default()).map_err(|e| {
        ConfigError::ParseError {
            message: e.to_string(),
        }
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, content + "\n").map_err(io_error)?;

    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::load_config;
    use crate::config::types::PLACEHOLDER_TOKEN;

    #[test]
    fn test_template_round_trips_through_hocon() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tagrelay.conf");

        write_default_config(&path).unwrap();
        let config = load_config(&path).unwrap();

        assert_eq!(config.telegram.token, PLACEHOLDER_TOKEN);
        assert_eq!(config.database.path, Config::default().database.path);
    }
}
