//! Error types for TradeCheck

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TradeCheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// TradeCheck error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid value {value:?} for {kind}")]
    InvalidEnumValue { kind: &'static str, value: String },

    #[error("Invalid time string {value:?}: {reason}")]
    InvalidTime { value: String, reason: String },

    #[error("Cannot sample {requested} distinct value(s) from {available}")]
    SampleTooLarge { requested: usize, available: usize },
}
