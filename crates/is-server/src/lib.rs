//! # is-server
//!
//! Exposes one [`StackEngine`](is_core::StackEngine) to unrelated processes
//! over a Unix domain socket.
//!
//! - `adapter`: maps channel requests onto engine operations
//! - `server`: socket lifecycle and the per-connection request loop
//! - `config`: server configuration from file, flags and environment

pub mod adapter;
pub mod config;
pub mod error;
pub mod server;

pub use adapter::StackDevice;
pub use config::ServerConfig;
pub use error::ServerError;
pub use server::Server;
