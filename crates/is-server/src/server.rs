//! Socket lifecycle and request loop.
//!
//! ```text
//! int-stack ──frames──> UnixListener ──spawn──> connection task
//!                                                   │ read_request
//!                                                   ▼
//!                                              StackDevice ──> StackEngine
//!                                                   │ write_response
//!                                                   ▼
//!                                                caller
//! ```
//!
//! Each connection is served by its own task; all tasks share one engine.

use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use is_core::{BudgetAllocator, BufferAllocator, StackEngine};
use is_proto::{read_request, write_response};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::adapter::StackDevice;
use crate::config::ServerConfig;
use crate::error::ServerError;

pub struct Server<A = BudgetAllocator> {
    config: ServerConfig,
    device: StackDevice<A>,
}

impl Server<BudgetAllocator> {
    /// Build the engine described by `config`.
    ///
    /// A failing `initial_capacity` is fatal: the server does not start.
    pub fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let engine = StackEngine::with_allocator(BudgetAllocator::new(config.max_buffer_bytes));
        if let Some(capacity) = config.initial_capacity {
            engine.resize(capacity)?;
        }
        Ok(Self::with_engine(config, Arc::new(engine)))
    }
}

impl<A: BufferAllocator + 'static> Server<A> {
    #[must_use]
    pub fn with_engine(config: ServerConfig, engine: Arc<StackEngine<A>>) -> Self {
        Self {
            config,
            device: StackDevice::new(engine),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn device(&self) -> &StackDevice<A> {
        &self.device
    }

    /// Bind the listening socket, replacing a stale socket file.
    ///
    /// Fails with `AddrInUse` if another server still answers on the path.
    pub fn bind(&self) -> Result<UnixListener, ServerError> {
        let path = &self.config.socket_path;
        remove_stale_socket(path)?;
        UnixListener::bind(path).map_err(|source| ServerError::Bind {
            path: path.clone(),
            source,
        })
    }

    /// Serve until `shutdown` resolves, then tear everything down.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve<F>(self, listener: UnixListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!(
            path = %self.config.socket_path.display(),
            capacity = ?self.device.engine().capacity(),
            "int_stack: loaded"
        );

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        debug!(active = connections.len() + 1, "connection accepted");
                        connections.spawn(serve_connection(stream, self.device.clone()));
                    }
                    Err(e) => {
                        let backoff = accept_backoff(&e);
                        warn!(error = %e, ?backoff, "accept failed");
                        tokio::time::sleep(backoff).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "connection task failed");
                    }
                }
            }
        }

        connections.shutdown().await;
        drop(listener);
        remove_socket_file(&self.config.socket_path)?;
        drop(self.device);
        info!("int_stack: unloaded");
        Ok(())
    }
}

/// Remove `path` only if no server is listening on it.
fn remove_stale_socket(path: &Path) -> Result<(), ServerError> {
    match std::os::unix::net::UnixStream::connect(path) {
        Ok(_) => Err(ServerError::Bind {
            path: path.to_path_buf(),
            source: io::Error::new(ErrorKind::AddrInUse, "another server is listening"),
        }),
        Err(e) if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::NotFound) => {
            remove_socket_file(path)
        }
        Err(source) => Err(ServerError::Bind {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// EMFILE and ENFILE
const FD_EXHAUSTED: [i32; 2] = [24, 23];

/// Pause after a failed accept. Descriptor exhaustion will not clear on
/// the next poll, so it waits longer.
fn accept_backoff(error: &io::Error) -> Duration {
    match error.raw_os_error() {
        Some(code) if FD_EXHAUSTED.contains(&code) => Duration::from_millis(500),
        _ => Duration::from_millis(50),
    }
}

fn remove_socket_file(path: &Path) -> Result<(), ServerError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Answer framed requests until the peer hangs up.
async fn serve_connection<A: BufferAllocator>(stream: UnixStream, device: StackDevice<A>) {
    let (mut reader, mut writer) = stream.into_split();
    loop {
        let request = match read_request(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(e) => {
                // Framing is lost; the stream cannot be resynchronized.
                warn!(error = %e, "malformed request, closing connection");
                break;
            }
        };
        let response = device.handle(&request);
        if let Err(e) = write_response(&mut writer, &response).await {
            warn!(error = %e, "failed to send response");
            break;
        }
    }
    debug!("connection closed");
}
