//! Process exit codes.
//!
//! Stack failures exit with the errno of the error (`Full` is 34, ERANGE),
//! so a script can tell a full stack from an I/O failure.

pub const EXIT_SUCCESS: i32 = 0;
/// Malformed invocation.
pub const EXIT_USAGE: i32 = 1;
/// Could not reach the server or the channel broke (EIO).
pub const EXIT_IO: i32 = 5;
