//! Message framing: header segment, record body, `0xFFFF` trailer.

use std::io::{Read, Write};

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::header::{encode_header_segment, expect_message_start, read_header, Header};
use super::recovery;
use super::wire_format::{read_sentinel, MESSAGE_END, MESSAGE_START, SENTINEL_SIZE};
use crate::codec::FieldCodec;
use crate::config::{CodecConfig, FramingMode};
use crate::error::{CodecError, ErrorKind, Result};

/// A header paired with a record body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Message<B> {
    pub header: Header,
    pub body: B,
}

impl<B> Message<B> {
    /// Create a message with the given header fields.
    pub fn new(id: u16, version: u8, body: B) -> Self {
        Self {
            header: Header::new(id, version),
            body,
        }
    }
}

/// Progress of a single decode.
///
/// Every state can move to `Failed`; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Reading (or skipping) the header segment.
    AwaitingHeader,
    /// Reading the record body.
    AwaitingBody,
    /// Checking the `0xFFFF` trailer.
    AwaitingTrailer,
    /// Message fully decoded.
    Complete,
    /// Decode stopped with an error of this kind.
    Failed(ErrorKind),
}

impl DecodeState {
    /// Check if the decode has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, DecodeState::Complete | DecodeState::Failed(_))
    }
}

/// Encodes and decodes framed messages over byte streams.
///
/// Holds configuration only, never a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageCodec {
    config: CodecConfig,
    fields: FieldCodec,
}

impl MessageCodec {
    /// Create a codec for `config`.
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            fields: FieldCodec::new(config),
        }
    }

    /// Configuration this codec was built with.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Field codec used for bodies.
    pub fn fields(&self) -> &FieldCodec {
        &self.fields
    }

    /// Write `message` as header segment, body and trailer.
    ///
    /// The first failure is returned. Bytes already written stay on the
    /// sink: the header segment and every body field that completed.
    pub fn encode<W, B>(&self, writer: &mut W, message: &Message<B>) -> Result<()>
    where
        W: Write + ?Sized,
        B: Serialize,
    {
        let order = self.config.byte_order;
        let mut prefix = BytesMut::with_capacity(16);
        encode_header_segment(&mut prefix, &message.header, &self.config);
        if self.config.framing == FramingMode::Detached {
            order.put_u16(&mut prefix, MESSAGE_START);
        }
        writer.write_all(&prefix)?;

        self.fields.encode_to(writer, &message.body)?;
        writer.write_all(&order.u16_bytes(MESSAGE_END))?;

        tracing::trace!(
            id = message.header.id,
            version = message.header.version,
            "encoded message"
        );
        Ok(())
    }

    /// Encode `message` into a fresh buffer.
    pub fn encode_to_vec<B: Serialize>(&self, message: &Message<B>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out, message)?;
        Ok(out)
    }

    /// Decode the next message into `message`.
    ///
    /// If `message.header` is already populated its segment is assumed to
    /// have been consumed and is skipped, so a caller that peeked the
    /// header can finish the decode with the body. In detached framing the
    /// message-start sentinel opens the body and is checked either way.
    ///
    /// On failure `message.header` keeps a header that decoded; the body
    /// is only replaced once the trailer has been verified.
    pub fn decode_into<R, B>(&self, reader: &mut R, message: &mut Message<B>) -> Result<()>
    where
        R: Read + ?Sized,
        B: DeserializeOwned,
    {
        self.decode_with_state(reader, message).1
    }

    /// Like [`decode_into`](Self::decode_into), also returning the state the
    /// decode ended in: [`DecodeState::Complete`] or the stage that failed.
    pub fn decode_with_state<R, B>(
        &self,
        reader: &mut R,
        message: &mut Message<B>,
    ) -> (DecodeState, Result<()>)
    where
        R: Read + ?Sized,
        B: DeserializeOwned,
    {
        let (state, result) = self.run(reader, &mut message.header);
        (state, result.map(|body| message.body = body))
    }

    /// Decode the next message, header included.
    pub fn decode<R, B>(&self, reader: &mut R) -> Result<Message<B>>
    where
        R: Read + ?Sized,
        B: DeserializeOwned,
    {
        let mut header = Header::default();
        let (_, result) = self.run(reader, &mut header);
        result.map(|body| Message { header, body })
    }

    /// Skip to just past the next `0xFF 0xFF` pair. See [`recovery::flush`].
    pub fn flush<R: Read + ?Sized>(&self, reader: &mut R) -> Result<usize> {
        recovery::flush(reader)
    }

    fn run<R, B>(&self, reader: &mut R, header: &mut Header) -> (DecodeState, Result<B>)
    where
        R: Read + ?Sized,
        B: DeserializeOwned,
    {
        let mut state = DecodeState::AwaitingHeader;
        match self.stages(&mut state, reader, header) {
            Ok(body) => {
                tracing::trace!(id = header.id, version = header.version, "decoded message");
                (state, Ok(body))
            }
            Err(e) => (self.fail(state, &e), Err(e)),
        }
    }

    /// Walk the decode stages, leaving `state` at the one in progress.
    fn stages<R, B>(&self, state: &mut DecodeState, reader: &mut R, header: &mut Header) -> Result<B>
    where
        R: Read + ?Sized,
        B: DeserializeOwned,
    {
        if header.is_empty() {
            *header = read_header(reader, &self.config)?;
        } else {
            tracing::trace!(id = header.id, "header present, resuming at body");
        }
        *state = DecodeState::AwaitingBody;
        let body = self.read_body(reader)?;
        *state = DecodeState::AwaitingTrailer;
        self.read_trailer(reader)?;
        *state = DecodeState::Complete;
        Ok(body)
    }

    fn fail(&self, state: DecodeState, err: &CodecError) -> DecodeState {
        if err.is_framing_error() {
            tracing::debug!(?state, error = %err, "framing error while decoding message");
        } else {
            tracing::trace!(?state, error = %err, "message decode failed");
        }
        DecodeState::Failed(err.kind())
    }

    fn read_body<R, B>(&self, reader: &mut R) -> Result<B>
    where
        R: Read + ?Sized,
        B: DeserializeOwned,
    {
        if self.config.framing == FramingMode::Detached {
            expect_message_start(reader, self.config.byte_order)?;
        }
        self.fields.decode_from(reader)
    }

    fn read_trailer<R: Read + ?Sized>(&self, reader: &mut R) -> Result<()> {
        let found: [u8; SENTINEL_SIZE] = read_sentinel(reader)?;
        if found != self.config.byte_order.u16_bytes(MESSAGE_END) {
            return Err(CodecError::MissingEndOfMessage { found });
        }
        Ok(())
    }
}
