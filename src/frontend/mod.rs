//! User-facing configuration
//!
//! A `.dtcorerc.toml` file (or the file named by `DTCORE_CONFIG`) selects
//! logging output and the option values applied at import time.

pub mod config;

pub use config::{Config, ConfigError};
