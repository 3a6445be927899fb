//! # is-proto
//!
//! Byte-level channel between callers and the stack engine.
//!
//! The channel mirrors a character device: a read pops, a write pushes, and
//! a narrow control call resizes.
//!
//! ## Wire Format
//!
//! Request: `[u8 magic 'S'][u8 opcode][u32 LE payload_len][payload]`
//!
//! | Opcode | Request | Payload |
//! |--------|---------|---------|
//! | 1 | `Read` | 4-byte LE buffer length offered by the caller |
//! | 2 | `Write` | bytes to push, exactly 4 (LE `i32`) to be accepted |
//! | 3 | `Control` | 4-byte LE command, then the command argument |
//!
//! Response: `[u8 status][u32 LE payload_len][payload]`, where status 0 is
//! success and anything else is the errno of a [`StackError`].
//!
//! [`StackError`]: is_core::StackError

/// Socket path shared by `int-stackd` and `int-stack` unless overridden.
pub const SOCKET_PATH_DEFAULT: &str = "/tmp/int_stack.sock";

pub mod codec;
pub mod error;
pub mod io;

pub use codec::{
    decode_value, Request, Response, CMD_SET_SIZE, HEADER_SIZE, MAGIC, PAYLOAD_SIZE_MAX, RESPONSE_HEADER_SIZE,
    VALUE_SIZE,
};
pub use error::{ProtoError, Result};
pub use io::{read_request, read_response, write_request, write_response};
