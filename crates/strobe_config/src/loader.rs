//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::resolve::{validate_fifo, validate_spi};
use crate::types::HarnessConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "strobe.toml";

/// Loads `<dir>/strobe.toml`, or the built-in defaults if the file does not exist.
pub fn load_config(dir: &Path) -> Result<HarnessConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(HarnessConfig::default());
    }
    load_config_file(&path)
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<HarnessConfig, ConfigError> {
    let config: HarnessConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks values that are wrong regardless of which scenario runs.
fn validate_config(config: &HarnessConfig) -> Result<(), ConfigError> {
    validate_fifo(&config.fifo)?;
    validate_spi(&config.spi)
}
