//! Codec configuration.
//!
//! One [`CodecConfig`] is handed to every codec at construction; the byte
//! order and framing mode are fixed for the codec's lifetime.
//!
//! # Example
//!
//! ```
//! use recordwire::{ByteOrder, CodecConfig, FramingMode};
//!
//! let config = CodecConfig::from_json(r#"{"framing": "header_delimited"}"#).unwrap();
//! assert_eq!(config.framing, FramingMode::HeaderDelimited);
//! assert_eq!(config.byte_order, ByteOrder::Little);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::{ByteOrder, DEFAULT_MAX_SEQUENCE_LEN};

/// How the header is delimited inside a message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// `START id version body END`.
    #[default]
    MessageOnly,
    /// `START 0xBB id version 0xCC body END`.
    HeaderDelimited,
    /// `0xBB id version 0xCC START body END`.
    Detached,
}

impl FramingMode {
    /// Whether the header carries its own `0xBB`/`0xCC` markers.
    #[inline]
    pub fn delimits_header(self) -> bool {
        !matches!(self, FramingMode::MessageOnly)
    }
}

/// Configuration shared by [`FieldCodec`](crate::codec::FieldCodec) and
/// [`MessageCodec`](crate::protocol::MessageCodec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Byte order for every multi-byte integer.
    pub byte_order: ByteOrder,
    /// Framing protocol variant.
    pub framing: FramingMode,
    /// Largest element count accepted for one sequence field.
    pub max_sequence_len: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Little,
            framing: FramingMode::MessageOnly,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
        }
    }
}

impl CodecConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the byte order for multi-byte values.
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Set the framing mode.
    pub fn with_framing(mut self, framing: FramingMode) -> Self {
        self.framing = framing;
        self
    }

    /// Set the largest sequence element count accepted on encode and decode.
    pub fn with_max_sequence_len(mut self, max_sequence_len: u32) -> Self {
        self.max_sequence_len = max_sequence_len;
        self
    }
}
