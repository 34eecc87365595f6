//! Protocol error types.

use thiserror::Error;

/// Errors related to protocol message handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid message type: {0}")]
    InvalidMessageType(u16),

    #[error("message too short: expected at least {expected}, got {got}")]
    MessageTooShort { expected: usize, got: usize },

    #[error("message too long: max {max}, got {got}")]
    MessageTooLong { max: usize, got: usize },

    #[error("size mismatch: header says {declared}, frame has {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("message type {msg_type} must be {expected} bytes, got {got}")]
    WrongFixedSize {
        msg_type: u16,
        expected: usize,
        got: usize,
    },

    #[error("malformed message: {0}")]
    Malformed(String),
}
