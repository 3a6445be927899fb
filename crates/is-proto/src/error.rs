//! Protocol errors.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtoError>;

/// Malformed frame or failed channel I/O.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("bad frame magic: {0:#04x}")]
    BadMagic(u8),

    #[error("unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("unknown response status: {0}")]
    UnknownStatus(u8),

    #[error("payload of {len} bytes exceeds maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}
