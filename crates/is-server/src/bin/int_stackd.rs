//! int-stackd: serves one shared integer stack over a Unix socket.
//!
//! # Usage
//!
//! ```bash
//! int-stackd --socket /tmp/int_stack.sock --initial-capacity 16
//! RUST_LOG=debug int-stackd --config /etc/int_stack.json
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use is_server::{Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "int-stackd")]
#[command(about = "Shared integer stack server")]
struct Cli {
    /// JSON config file; flags override its values.
    #[arg(long, env = "INT_STACK_CONFIG")]
    config: Option<PathBuf>,

    /// Path of the listening socket.
    #[arg(long, env = "INT_STACK_SOCKET")]
    socket: Option<PathBuf>,

    /// Capacity to set at startup.
    #[arg(long)]
    initial_capacity: Option<i32>,

    /// Largest stack buffer in bytes.
    #[arg(long)]
    max_buffer_bytes: Option<usize>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long)]
    log_filter: Option<String>,
}

fn load_config(cli: &Cli) -> Result<ServerConfig, is_server::ServerError> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(socket) = &cli.socket {
        config.socket_path = socket.clone();
    }
    if let Some(capacity) = cli.initial_capacity {
        config.initial_capacity = Some(capacity);
    }
    if let Some(bytes) = cli.max_buffer_bytes {
        config.max_buffer_bytes = bytes;
    }
    if let Some(filter) = &cli.log_filter {
        config.log_filter = filter.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = match Server::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize stack");
            process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(error = %e, "server failed");
        process::exit(1);
    }
}
