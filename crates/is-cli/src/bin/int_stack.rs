//! int-stack: command-line client for the shared integer stack.
//!
//! Usage:
//!   int-stack set-size 3
//!   int-stack push 7
//!   int-stack pop
//!   int-stack unwind

use std::process;

use clap::Parser;
use is_cli::exit::{EXIT_SUCCESS, EXIT_USAGE};
use is_cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = run(&cli, &mut std::io::stdout().lock(), &mut std::io::stderr().lock()).await;
    process::exit(code);
}
