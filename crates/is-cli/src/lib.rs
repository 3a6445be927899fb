//! # is-cli
//!
//! Client side of the shared integer stack: a socket [`Client`] and the
//! `int-stack` command line built on it.
//!
//! | Command | Operation | Output |
//! |---------|-----------|--------|
//! | `set-size <n>` | resize | nothing |
//! | `push <v>` | push | nothing, or `ERROR: stack is full` |
//! | `pop` | pop | the value, or `NULL` |
//! | `unwind` | pop until empty | one value per line, newest first |

pub mod cli;
pub mod client;
pub mod exit;

pub use cli::{run, Cli, Command};
pub use client::{Client, ClientError};
