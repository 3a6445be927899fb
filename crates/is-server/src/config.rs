//! Server configuration.
//!
//! Values come from an optional JSON file; command-line flags and their
//! environment fallbacks override individual fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ServerError;

pub use is_proto::SOCKET_PATH_DEFAULT;

/// Default cap on the stack buffer (64 MiB).
pub const MAX_BUFFER_BYTES_DEFAULT: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Where the listening socket is created.
    pub socket_path: PathBuf,
    /// Capacity applied at startup; the stack stays uninitialized if unset.
    pub initial_capacity: Option<i32>,
    /// Largest buffer a resize may allocate, in bytes.
    pub max_buffer_bytes: usize,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(SOCKET_PATH_DEFAULT),
            initial_capacity: None,
            max_buffer_bytes: MAX_BUFFER_BYTES_DEFAULT,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ServerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(ServerError::InvalidConfig("socket_path is empty".into()));
        }
        if self.max_buffer_bytes < std::mem::size_of::<i32>() {
            return Err(ServerError::InvalidConfig(format!(
                "max_buffer_bytes {} cannot hold a single element",
                self.max_buffer_bytes
            )));
        }
        if let Some(capacity) = self.initial_capacity {
            if capacity <= 0 {
                return Err(ServerError::InvalidConfig(format!(
                    "initial_capacity must be > 0, got {}",
                    capacity
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: i32) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = bytes;
        self
    }
}
