//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::MarketConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CARBON_MARKET_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MarketConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: MarketConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `CARBON_MARKET_CONFIG`, or validated defaults when unset.
pub fn load_from_env() -> Result<(MarketConfig, Option<std::path::PathBuf>), ConfigError> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            let config = MarketConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok((config, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transactions]\nbase_fee = 250").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.transactions.base_fee, 250);
    }

    #[test]
    fn test_invalid_file_reports_all_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[wallet]\nsign_timeout_secs = 0\npoll_interval_ms = 0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ledger").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/carbon.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
