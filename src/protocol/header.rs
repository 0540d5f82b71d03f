//! Message header and its sentinel-framed encoding.
//!
//! The header segment depends on the configured [`FramingMode`]:
//!
//! ```text
//! MessageOnly      AA AA  id(2) ver(1)
//! HeaderDelimited  AA AA  BB  id(2) ver(1)  CC
//! Detached                BB  id(2) ver(1)  CC        (AA AA opens the body)
//! ```

use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};

use super::wire_format::{
    read_sentinel, read_u8, ByteOrder, HEADER_END, HEADER_SIZE, HEADER_START, MESSAGE_START,
    SENTINEL_SIZE,
};
use crate::config::{CodecConfig, FramingMode};
use crate::error::{CodecError, Result};

/// Type tag and format version preceding every body.
///
/// The all-zero value is the "not yet decoded" header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Application-chosen message/type identifier.
    pub id: u16,
    /// Format version of the body. Carried, never interpreted.
    pub version: u8,
}

impl Header {
    /// Create a new header.
    pub fn new(id: u16, version: u8) -> Self {
        Self { id, version }
    }

    /// Check if this header is still at its zero value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Header::default()
    }

    /// Append the header fields, optionally between `0xBB`/`0xCC` markers.
    pub fn encode_into(&self, buf: &mut BytesMut, order: ByteOrder, delimited: bool) {
        if delimited {
            buf.put_u8(HEADER_START);
        }
        order.put_u16(buf, self.id);
        buf.put_u8(self.version);
        if delimited {
            buf.put_u8(HEADER_END);
        }
    }

    /// Read the header fields, checking `0xBB`/`0xCC` markers when
    /// `delimited` is set.
    pub fn read_from<R: Read + ?Sized>(
        reader: &mut R,
        order: ByteOrder,
        delimited: bool,
    ) -> Result<Self> {
        if delimited {
            let found = read_u8(reader)?;
            if found != HEADER_START {
                return Err(CodecError::MissingStartOfHeader { found });
            }
        }
        let id = order.read_u16(reader)?;
        let version = read_u8(reader)?;
        if delimited {
            let found = read_u8(reader)?;
            if found != HEADER_END {
                return Err(CodecError::MissingEndOfHeader { found });
            }
        }
        Ok(Self { id, version })
    }
}

/// Check the next two bytes against the message start sentinel.
///
/// Reads nothing beyond the two compared bytes.
pub(crate) fn expect_message_start<R: Read + ?Sized>(reader: &mut R, order: ByteOrder) -> Result<()> {
    let found = read_sentinel(reader)?;
    if found != order.u16_bytes(MESSAGE_START) {
        return Err(CodecError::MissingStartOfMessage { found });
    }
    Ok(())
}

/// Append the header segment for the configured framing mode.
pub(crate) fn encode_header_segment(buf: &mut BytesMut, header: &Header, config: &CodecConfig) {
    let order = config.byte_order;
    match config.framing {
        FramingMode::MessageOnly | FramingMode::HeaderDelimited => {
            order.put_u16(buf, MESSAGE_START);
            header.encode_into(buf, order, config.framing.delimits_header());
        }
        FramingMode::Detached => header.encode_into(buf, order, true),
    }
}

/// Write the header segment for the configured framing mode.
///
/// Never fails except on the sink's own write error.
pub fn write_header<W: Write + ?Sized>(
    writer: &mut W,
    header: &Header,
    config: &CodecConfig,
) -> Result<()> {
    let mut buf = BytesMut::with_capacity(SENTINEL_SIZE + HEADER_SIZE + 2);
    encode_header_segment(&mut buf, header, config);
    writer.write_all(&buf)?;
    Ok(())
}

/// Read and validate the header segment for the configured framing mode.
///
/// # Errors
///
/// - [`CodecError::MissingStartOfMessage`] if the stream is not at `0xAAAA`
///   (message-only and header-delimited framing)
/// - [`CodecError::MissingStartOfHeader`] / [`CodecError::MissingEndOfHeader`]
///   if the header markers are absent (header-delimited and detached framing)
/// - the stream's I/O error if it ends early
pub fn read_header<R: Read + ?Sized>(reader: &mut R, config: &CodecConfig) -> Result<Header> {
    let order = config.byte_order;
    match config.framing {
        FramingMode::MessageOnly | FramingMode::HeaderDelimited => {
            expect_message_start(reader, order)?;
            Header::read_from(reader, order, config.framing.delimits_header())
        }
        FramingMode::Detached => Header::read_from(reader, order, true),
    }
}
