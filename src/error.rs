//! Error types for recordwire.

use std::fmt::Display;

use thiserror::Error;

/// Main error type for all codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Header start marker (`0xBB`) not found.
    #[error("not at the start of a header: expected 0xbb, got {found:#04x}")]
    MissingStartOfHeader { found: u8 },

    /// Header end marker (`0xCC`) not found.
    #[error("bytes left on the header: expected 0xcc, got {found:#04x}")]
    MissingEndOfHeader { found: u8 },

    /// Message start sentinel (`0xAAAA`) not found at the current offset.
    #[error("not at the start of a valid message: got {found:02x?}")]
    MissingStartOfMessage { found: [u8; 2] },

    /// Body decoded but the trailing sentinel (`0xFFFF`) is absent.
    #[error("bytes left on the message: expected end sentinel, got {found:02x?}")]
    MissingEndOfMessage { found: [u8; 2] },

    /// A body field has a shape the codec cannot encode.
    #[error("unsupported field type {type_name} for field `{field}`: {shape}")]
    UnsupportedFieldType {
        field: String,
        type_name: &'static str,
        shape: &'static str,
    },

    /// Text does not fit the 2-byte length prefix.
    #[error("text of {len} bytes exceeds maximum {max}")]
    TextTooLong { len: usize, max: usize },

    /// Sequence count exceeds the configured maximum.
    #[error("sequence of {len} elements exceeds maximum {max}")]
    SequenceTooLong { len: usize, max: u32 },

    /// Decoded text is not valid UTF-8.
    #[error("invalid text: {0}")]
    InvalidText(#[from] std::string::FromUtf8Error),

    /// Decoded char is not a Unicode scalar value.
    #[error("invalid char value {0:#x}")]
    InvalidChar(u32),

    /// Recovery scanned its whole budget without finding a trailer.
    #[error("no end of message found within {limit} bytes")]
    RecoveryLimitExceeded { limit: usize },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Error raised by a `Serialize` or `Deserialize` implementation.
    #[error("{0}")]
    Message(String),

    /// I/O error from the underlying stream, passed through untouched.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `0xBB` header marker absent.
    MissingStartOfHeader,
    /// `0xCC` header marker absent.
    MissingEndOfHeader,
    /// `0xAAAA` start sentinel absent.
    MissingStartOfMessage,
    /// `0xFFFF` trailer absent.
    MissingEndOfMessage,
    /// Field shape the codec cannot carry.
    UnsupportedFieldType,
    /// A length or count out of range.
    InvalidLength,
    /// Decoded bytes do not form a valid value.
    InvalidData,
    /// Configuration could not be parsed.
    Config,
    /// Error from the underlying stream.
    Io,
}

impl CodecError {
    pub(crate) fn unsupported(shape: &'static str) -> Self {
        CodecError::UnsupportedFieldType {
            field: String::new(),
            type_name: "",
            shape,
        }
    }

    /// Attach the enclosing field's name and type to an unsupported-shape
    /// error raised deeper in the value. The first attachment wins.
    pub(crate) fn in_field(self, field: &str, type_name: &'static str) -> Self {
        match self {
            CodecError::UnsupportedFieldType {
                field: inner,
                shape,
                ..
            } if inner.is_empty() => CodecError::UnsupportedFieldType {
                field: field.to_string(),
                type_name,
                shape,
            },
            other => other,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::MissingStartOfHeader { .. } => ErrorKind::MissingStartOfHeader,
            CodecError::MissingEndOfHeader { .. } => ErrorKind::MissingEndOfHeader,
            CodecError::MissingStartOfMessage { .. } => ErrorKind::MissingStartOfMessage,
            CodecError::MissingEndOfMessage { .. } => ErrorKind::MissingEndOfMessage,
            CodecError::UnsupportedFieldType { .. } => ErrorKind::UnsupportedFieldType,
            CodecError::TextTooLong { .. }
            | CodecError::SequenceTooLong { .. }
            | CodecError::RecoveryLimitExceeded { .. } => ErrorKind::InvalidLength,
            CodecError::InvalidText(_) | CodecError::InvalidChar(_) | CodecError::Message(_) => {
                ErrorKind::InvalidData
            }
            CodecError::Config(_) => ErrorKind::Config,
            CodecError::Io(_) => ErrorKind::Io,
        }
    }

    /// Check if this is a sentinel/delimiter mismatch.
    pub fn is_framing_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingStartOfHeader
                | ErrorKind::MissingEndOfHeader
                | ErrorKind::MissingStartOfMessage
                | ErrorKind::MissingEndOfMessage
        )
    }

    /// Check if the stream can be realigned and decoding retried.
    ///
    /// Only meaningful for errors returned by a decode: an encode failure
    /// (including an over-long sequence on the encode side) is a schema
    /// error with no stream to realign. Schema errors and I/O failures are
    /// never recoverable by retrying.
    pub fn is_recoverable(&self) -> bool {
        self.is_framing_error()
            || matches!(
                self,
                CodecError::SequenceTooLong { .. }
                    | CodecError::InvalidText(_)
                    | CodecError::InvalidChar(_)
            )
    }
}

impl serde::ser::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        CodecError::Message(msg.to_string())
    }
}

impl serde::de::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        CodecError::Message(msg.to_string())
    }
}

/// Result type alias using CodecError.
pub type Result<T> = std::result::Result<T, CodecError>;
