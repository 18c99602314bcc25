//! Error types for configuration loading and validation.

use strobe_common::{ParseDurationError, ParseFrequencyError};

/// Errors that can occur when loading or resolving a `strobe.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A duration string could not be parsed.
    #[error("invalid duration for {field}: {source}")]
    InvalidDuration {
        /// Dotted path of the offending field.
        field: String,
        /// The underlying parse failure.
        source: ParseDurationError,
    },

    /// A frequency string could not be parsed.
    #[error("invalid frequency for {field}: {source}")]
    InvalidFrequency {
        /// Dotted path of the offending field.
        field: String,
        /// The underlying parse failure.
        source: ParseFrequencyError,
    },
}
