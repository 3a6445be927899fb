//! Socket client.

use std::path::{Path, PathBuf};

use is_core::StackError;
use is_proto::{read_response, write_request, ProtoError, Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::debug;

use crate::exit::EXIT_IO;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to open {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Stack(#[from] StackError),
}

impl ClientError {
    /// Exit code reported by the command line for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Connect { .. } | Self::Proto(_) => EXIT_IO,
            Self::Stack(e) => e.errno(),
        }
    }
}

/// One connection to the stack server.
pub struct Client {
    stream: UnixStream,
}

impl Client {
    pub async fn connect(path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| ClientError::Connect {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "connected");
        Ok(Self { stream })
    }

    async fn call(&mut self, request: &Request) -> Result<Response, ClientError> {
        write_request(&mut self.stream, request).await?;
        let response = read_response(&mut self.stream).await?;
        debug!(?request, ?response, "call completed");
        Ok(response)
    }

    pub async fn set_size(&mut self, capacity: i32) -> Result<(), ClientError> {
        Ok(self.call(&Request::set_size(capacity)).await?.into_unit()?)
    }

    pub async fn push(&mut self, value: i32) -> Result<(), ClientError> {
        Ok(self.call(&Request::push(value)).await?.into_unit()?)
    }

    /// `Ok(None)` when the stack is empty.
    pub async fn pop(&mut self) -> Result<Option<i32>, ClientError> {
        Ok(self.call(&Request::pop()).await?.into_value()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ClientError::Stack(StackError::Full).exit_code(), 34);
        assert_eq!(ClientError::Stack(StackError::InvalidArgument).exit_code(), 22);
        assert_eq!(
            ClientError::Proto(ProtoError::UnknownStatus(200)).exit_code(),
            EXIT_IO
        );
    }

    #[tokio::test]
    async fn test_connect_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let err = Client::connect(&dir.path().join("missing.sock"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::Connect { .. }));
        assert_eq!(err.exit_code(), EXIT_IO);
    }
}
