//! # recordwire
//!
//! Sentinel-framed binary messages with serde-driven record bodies.
//!
//! Every message carries a small header (a `u16` type identifier and a `u8`
//! format version) followed by a record body and a trailer:
//!
//! ```text
//! AA AA | id (2) | version (1) | body | FF FF
//! ```
//!
//! Bodies are ordinary structs deriving `Serialize`/`Deserialize`. Fields
//! are written in declaration order with no names or tags: fixed-width
//! values as raw images, sequences with a 4-byte element count, text with a
//! 2-byte length.
//!
//! ## Architecture
//!
//! - [`codec`]: the field codec, a serde `Serializer`/`Deserializer` pair
//! - [`protocol`]: sentinels, headers, message framing and stream recovery
//! - [`config`]: byte order, framing mode and limits
//!
//! ## Example
//!
//! ```
//! use recordwire::{Message, MessageCodec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Reading {
//!     name: String,
//!     values: Vec<u8>,
//! }
//!
//! let codec = MessageCodec::default();
//! let message = Message::new(7, 1, Reading { name: "ok".into(), values: vec![1, 2, 3] });
//!
//! let bytes = codec.encode_to_vec(&message).unwrap();
//! assert_eq!(&bytes[..5], &[0xAA, 0xAA, 0x07, 0x00, 0x01]);
//! assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xFF]);
//!
//! let decoded: Message<Reading> = codec.decode(&mut bytes.as_slice()).unwrap();
//! assert_eq!(decoded, message);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;

pub use codec::FieldCodec;
pub use config::{CodecConfig, FramingMode};
pub use error::{CodecError, ErrorKind, Result};
pub use protocol::{flush, flush_with_limit, ByteOrder, DecodeState, Header, Message, MessageCodec};
