//! Error taxonomy for stack operations.

use thiserror::Error;

/// errno reported for an argument the engine rejects.
pub const EINVAL: i32 = 22;
/// errno reported when a push finds the stack full.
pub const ERANGE: i32 = 34;
/// errno reported when resize cannot allocate its buffer.
pub const ENOMEM: i32 = 12;
/// errno reported for a push before any capacity was set.
pub const ENODATA: i32 = 61;

/// Failure of a stack operation.
///
/// Every variant is recoverable: the engine state is unchanged and the
/// caller decides whether to fix its input, resize, or retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum StackError {
    /// Non-positive capacity or a malformed request payload.
    #[error("invalid argument")]
    InvalidArgument,

    /// Push attempted before any capacity was set.
    #[error("stack capacity has not been set")]
    Uninitialized,

    /// Push attempted while `count == capacity`.
    #[error("stack is full")]
    Full,

    /// The new buffer for a resize could not be allocated.
    #[error("cannot allocate stack buffer")]
    ResourceExhausted,
}

impl StackError {
    /// POSIX-style code carried on the wire and used as a process exit code.
    #[must_use]
    pub fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument => EINVAL,
            Self::Uninitialized => ENODATA,
            Self::Full => ERANGE,
            Self::ResourceExhausted => ENOMEM,
        }
    }

    /// Inverse of [`StackError::errno`].
    #[must_use]
    pub fn from_errno(code: i32) -> Option<Self> {
        match code {
            EINVAL => Some(Self::InvalidArgument),
            ENODATA => Some(Self::Uninitialized),
            ERANGE => Some(Self::Full),
            ENOMEM => Some(Self::ResourceExhausted),
            _ => None,
        }
    }
}
