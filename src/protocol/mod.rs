//! Protocol module - sentinels, headers, message framing and recovery.
//!
//! This module implements the byte-level framing around record bodies:
//! - wire format constants and byte-order helpers
//! - header encoding/decoding for each framing mode
//! - message encode/decode with a resumable header
//! - realignment of a stream after a failed decode

mod header;
mod message;
mod recovery;
mod wire_format;

pub use header::{read_header, write_header, Header};
pub use message::{DecodeState, Message, MessageCodec};
pub use recovery::{flush, flush_with_limit};
pub use wire_format::{
    read_sentinel, read_u8, ByteOrder, DEFAULT_MAX_SEQUENCE_LEN, HEADER_END, HEADER_SIZE,
    HEADER_START, MAX_TEXT_LEN, MESSAGE_END, MESSAGE_START, SENTINEL_SIZE, SEQUENCE_PREFIX_SIZE,
    TEXT_PREFIX_SIZE,
};
