//! Parsing, validation, and resolution of `strobe.toml` harness configuration.
//!
//! [`HarnessConfig`] mirrors the file layout with every section defaulted.
//! Scenarios never read it directly: they call [`resolve_fifo`] or
//! [`resolve_spi`] once, before any simulation time advances, and work with
//! the concrete femtosecond and cycle counts those return.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_fifo, resolve_spi, ResolvedFifo, ResolvedSpi};
pub use types::*;
