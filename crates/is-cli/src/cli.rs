//! Argument parsing and command execution for `int-stack`.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use is_core::StackError;
use is_proto::SOCKET_PATH_DEFAULT;
use tracing::warn;

use crate::client::{Client, ClientError};
use crate::exit::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser, Debug)]
#[command(name = "int-stack", version, about = "Operate on the shared integer stack")]
pub struct Cli {
    /// Path of the server's socket
    #[arg(long, env = "INT_STACK_SOCKET", default_value = SOCKET_PATH_DEFAULT)]
    pub socket: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set the stack capacity
    SetSize {
        #[arg(allow_negative_numbers = true)]
        size: i32,
    },
    /// Push a value
    Push {
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },
    /// Pop the top value, printing NULL if the stack is empty
    Pop,
    /// Pop and print every value until the stack is empty
    Unwind,
}

/// Runs one command against the server and returns the process exit code.
///
/// Results go to `out`; diagnostics for I/O and protocol failures go to `err`.
pub async fn run<O, E>(cli: &Cli, out: &mut O, err: &mut E) -> i32
where
    O: Write,
    E: Write,
{
    if let Command::SetSize { size } = cli.command {
        if size <= 0 {
            return report(writeln!(out, "ERROR: size should be > 0"), EXIT_USAGE);
        }
    }

    let result = match Client::connect(&cli.socket).await {
        Ok(mut client) => execute(&mut client, cli.command, out).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => report(out.flush(), EXIT_SUCCESS),
        Err(Failure::Client(ClientError::Stack(StackError::Full))) => {
            report(writeln!(out, "ERROR: stack is full"), StackError::Full.errno())
        }
        Err(Failure::Client(e)) => {
            warn!(error = %e, "command failed");
            report(writeln!(err, "int-stack: {e}"), e.exit_code())
        }
        Err(Failure::Output(e)) => {
            let _ = writeln!(err, "int-stack: {e}");
            EXIT_IO
        }
    }
}

enum Failure {
    Client(ClientError),
    Output(io::Error),
}

impl From<ClientError> for Failure {
    fn from(e: ClientError) -> Self {
        Self::Client(e)
    }
}

impl From<io::Error> for Failure {
    fn from(e: io::Error) -> Self {
        Self::Output(e)
    }
}

async fn execute<O: Write>(client: &mut Client, command: Command, out: &mut O) -> Result<(), Failure> {
    match command {
        Command::SetSize { size } => client.set_size(size).await?,
        Command::Push { value } => client.push(value).await?,
        Command::Pop => match client.pop().await? {
            Some(value) => writeln!(out, "{value}")?,
            None => writeln!(out, "NULL")?,
        },
        Command::Unwind => {
            while let Some(value) = client.pop().await? {
                writeln!(out, "{value}")?;
            }
        }
    }
    Ok(())
}

/// Exit with `code` unless writing the message itself failed.
fn report(written: io::Result<()>, code: i32) -> i32 {
    match written {
        Ok(()) => code,
        Err(_) => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("int-stack").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse(&["set-size", "3"]).unwrap().command, Command::SetSize { size: 3 });
        assert_eq!(parse(&["push", "-7"]).unwrap().command, Command::Push { value: -7 });
        assert_eq!(parse(&["pop"]).unwrap().command, Command::Pop);
        assert_eq!(parse(&["unwind"]).unwrap().command, Command::Unwind);
    }

    #[test]
    fn test_negative_size_parses() {
        assert_eq!(parse(&["set-size", "-1"]).unwrap().command, Command::SetSize { size: -1 });
    }

    #[test]
    fn test_socket_override() {
        let cli = parse(&["--socket", "/run/s.sock", "pop"]).unwrap();
        assert_eq!(cli.socket, PathBuf::from("/run/s.sock"));
    }

    #[test]
    fn test_rejects_bad_invocations() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["push"]).is_err());
        assert!(parse(&["push", "abc"]).is_err());
        assert!(parse(&["push", "99999999999"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
    }

    #[tokio::test]
    async fn test_non_positive_size_rejected_locally() {
        let cli = Cli {
            socket: PathBuf::from("/nonexistent/int_stack.sock"),
            command: Command::SetSize { size: 0 },
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        assert_eq!(run(&cli, &mut out, &mut err).await, EXIT_USAGE);
        assert_eq!(String::from_utf8(out).unwrap(), "ERROR: size should be > 0\n");
        assert!(err.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            socket: dir.path().join("missing.sock"),
            command: Command::Pop,
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        assert_eq!(run(&cli, &mut out, &mut err).await, EXIT_IO);
        assert!(out.is_empty());
        assert!(String::from_utf8(err).unwrap().starts_with("int-stack: failed to open"));
    }
}
