//! Stream realignment after a failed decode.
//!
//! The scan looks for the trailer bytes `0xFF 0xFF` one byte at a time.
//! A body that itself contains two consecutive `0xFF` bytes is
//! indistinguishable from a trailer, so recovery is best effort.

use std::io::Read;

use super::wire_format::read_u8;
use crate::error::{CodecError, Result};

const TRAILER_BYTE: u8 = 0xFF;

/// Consume bytes until two consecutive `0xFF` have been read.
///
/// Returns the number of bytes consumed, trailer included. The stream is
/// left positioned just past the trailer. If the stream ends first, its
/// I/O error is returned.
pub fn flush<R: Read + ?Sized>(reader: &mut R) -> Result<usize> {
    scan(reader, None)
}

/// Like [`flush`], but give up with [`CodecError::RecoveryLimitExceeded`]
/// after `limit` bytes without a trailer.
pub fn flush_with_limit<R: Read + ?Sized>(reader: &mut R, limit: usize) -> Result<usize> {
    scan(reader, Some(limit))
}

fn scan<R: Read + ?Sized>(reader: &mut R, limit: Option<usize>) -> Result<usize> {
    let mut consumed = 0usize;
    let mut previous_ff = false;
    loop {
        if let Some(limit) = limit {
            if consumed >= limit {
                tracing::warn!(limit, "no end of message found within recovery limit");
                return Err(CodecError::RecoveryLimitExceeded { limit });
            }
        }
        let byte = read_u8(reader)?;
        consumed += 1;
        let is_ff = byte == TRAILER_BYTE;
        if is_ff && previous_ff {
            tracing::debug!(consumed, "stream realigned past end of message");
            return Ok(consumed);
        }
        previous_ff = is_ff;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_flush_stops_after_trailer() {
        let mut cursor = Cursor::new(vec![0x01, 0x02, 0xFF, 0xFF, 0x99]);
        assert_eq!(flush(&mut cursor).unwrap(), 4);
        assert_eq!(read_u8(&mut cursor).unwrap(), 0x99);
    }

    #[test]
    fn test_flush_at_trailer() {
        let mut cursor = Cursor::new(vec![0xFF, 0xFF]);
        assert_eq!(flush(&mut cursor).unwrap(), 2);
    }

    #[test]
    fn test_flush_requires_consecutive_ff() {
        let mut cursor = Cursor::new(vec![0xFF, 0x00, 0xFF, 0x01, 0xFF, 0xFF, 0x07]);
        assert_eq!(flush(&mut cursor).unwrap(), 6);
        assert_eq!(cursor.position(), 6);
    }

    #[test]
    fn test_flush_odd_run_of_ff() {
        // The first pair wins; the third 0xFF is left on the stream.
        let mut cursor = Cursor::new(vec![0xFF, 0xFF, 0xFF]);
        assert_eq!(flush(&mut cursor).unwrap(), 2);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_flush_eof_is_io_error() {
        let mut cursor = Cursor::new(vec![0xFF]);
        match flush(&mut cursor).unwrap_err() {
            CodecError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_flush_with_limit() {
        let bytes = vec![0x00; 16];
        let mut cursor = Cursor::new(bytes);
        let err = flush_with_limit(&mut cursor, 8).unwrap_err();
        assert!(matches!(err, CodecError::RecoveryLimitExceeded { limit: 8 }));
        assert_eq!(cursor.position(), 8);

        let mut cursor = Cursor::new(vec![0x00, 0xFF, 0xFF]);
        assert_eq!(flush_with_limit(&mut cursor, 3).unwrap(), 3);
    }
}
