//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while marshalling or unmarshalling a datagram.
///
/// Every variant except [`ProtocolError::ShapeMismatch`] means the peer sent
/// bytes that do not match the expected layout.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Encoded message would not fit in one datagram.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Input ended before the shape was fully read.
    #[error("unexpected end of payload: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// Input continued after the shape was fully read.
    #[error("{count} trailing bytes after payload")]
    TrailingBytes { count: usize },

    /// Presence marker other than 0 or 1.
    #[error("invalid presence byte: {0:#04x}")]
    InvalidPresence(u8),

    /// Boolean byte other than 0 or 1.
    #[error("invalid boolean byte: {0:#04x}")]
    InvalidBool(u8),

    /// String bytes are not UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// List count cannot possibly be satisfied by the remaining input.
    #[error("list of {count} elements exceeds payload bounds")]
    ListTooLong { count: usize },

    /// A value does not fit the shape it is being encoded or read as.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },
}

impl ProtocolError {
    pub(crate) fn mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
