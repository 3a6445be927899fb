use std::path::PathBuf;

use is_core::StackError;
use thiserror::Error;

/// Server startup and lifecycle errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("initial resize failed: {0}")]
    InitialCapacity(#[from] StackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
