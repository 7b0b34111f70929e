//! TradeCheck Common Library
//!
//! Shared types and utilities for the TradeCheck test toolkit: run options
//! and environment config, trading enums, price parsing, time helpers.

pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod numeric;
pub mod types;

// Re-export commonly used types
pub use config::{Platform, RunOptions, RuntimeConfig, Source};
pub use error::{Error, Result};
pub use numeric::{parse_tolerant_number, ParseNumberError};
pub use types::*;

/// TradeCheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default directory holding `<env>.yaml` files
pub fn default_config_dir() -> std::path::PathBuf {
    std::env::var_os("TRADECHECK_CONFIG_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("config"))
}
