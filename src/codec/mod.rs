//! Codec module - generic field-by-field body encoding.
//!
//! Bodies are plain records deriving serde's `Serialize`/`Deserialize`. The
//! derived code walks the fields in declaration order and this codec maps
//! each one to one of three wire shapes:
//!
//! - fixed-width scalar (`bool`, integers, floats, `char`, and fixed-size
//!   aggregates of those: arrays, tuples, nested records) written as a direct
//!   byte image
//! - variable-length sequence of fixed-width elements, prefixed with a 4-byte
//!   element count
//! - text, prefixed with a 2-byte length
//!
//! Anything else is rejected with
//! [`CodecError::UnsupportedFieldType`](crate::CodecError::UnsupportedFieldType).
//! No field names or tags are transmitted.
//!
//! # Example
//!
//! ```
//! use recordwire::codec::FieldCodec;
//! use recordwire::CodecConfig;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Reading {
//!     name: String,
//!     values: Vec<u8>,
//! }
//!
//! let codec = FieldCodec::new(CodecConfig::default());
//! let reading = Reading { name: "ok".to_string(), values: vec![1, 2, 3] };
//!
//! let bytes = codec.encode(&reading).unwrap();
//! assert_eq!(bytes, [0x02, 0x00, b'o', b'k', 0x03, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03]);
//!
//! let decoded: Reading = codec.decode(&bytes).unwrap();
//! assert_eq!(decoded, reading);
//! ```

mod de;
mod ser;

use std::any::type_name;
use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CodecConfig;
use crate::error::Result;

use de::RecordDeserializer;
use ser::RecordSerializer;

const BODY: &str = "<body>";

/// Encoder/decoder for message bodies.
///
/// Holds only its configuration; every call works on the stream it is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldCodec {
    config: CodecConfig,
}

impl FieldCodec {
    /// Create a codec with the given configuration.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// The configuration this codec was built with.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode `body` field by field onto `writer`.
    ///
    /// # Errors
    ///
    /// Fails on the first unsupported or oversized field. Fields before it
    /// have already been written; nothing of the failing field is.
    pub fn encode_to<W, T>(&self, writer: &mut W, body: &T) -> Result<()>
    where
        W: Write + ?Sized,
        T: Serialize + ?Sized,
    {
        let mut serializer = RecordSerializer::new(writer, self.config);
        body.serialize(&mut serializer)
            .map_err(|e| e.in_field(BODY, type_name::<T>()))
    }

    /// Encode `body` into a new byte vector.
    pub fn encode<T: Serialize + ?Sized>(&self, body: &T) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_to(&mut out, body)?;
        Ok(out)
    }

    /// Decode a body from `reader`, consuming exactly its encoded bytes.
    pub fn decode_from<R, T>(&self, reader: &mut R) -> Result<T>
    where
        R: Read + ?Sized,
        T: DeserializeOwned,
    {
        let mut deserializer = RecordDeserializer::new(reader, self.config);
        T::deserialize(&mut deserializer).map_err(|e| e.in_field(BODY, type_name::<T>()))
    }

    /// Decode a body from the front of `bytes`. Trailing bytes are ignored.
    pub fn decode<T: DeserializeOwned>(&self, mut bytes: &[u8]) -> Result<T> {
        self.decode_from(&mut bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::protocol::ByteOrder;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::io::Cursor;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Scalars {
        flag: bool,
        small: i8,
        id: u16,
        count: u32,
        offset: i64,
        ratio: f32,
        precise: f64,
        letter: char,
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
    struct Point {
        x: i16,
        y: i16,
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Shape {
        label: String,
        origin: Point,
        vertices: Vec<Point>,
        color: [u8; 3],
        span: (u8, u16),
    }

    fn codec() -> FieldCodec {
        FieldCodec::new(CodecConfig::default())
    }

    #[test]
    fn test_scalars_roundtrip() {
        let original = Scalars {
            flag: true,
            small: -3,
            id: 0xBEEF,
            count: 7,
            offset: -1_000_000,
            ratio: 0.5,
            precise: 2.25,
            letter: 'λ',
        };
        let bytes = codec().encode(&original).unwrap();
        assert_eq!(bytes.len(), 1 + 1 + 2 + 4 + 8 + 4 + 8 + 4);

        let decoded: Scalars = codec().decode(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_scalar_images_little_endian() {
        #[derive(Serialize)]
        struct Pair {
            a: u16,
            b: u32,
        }
        let bytes = codec().encode(&Pair { a: 0x0102, b: 0x0304_0506 }).unwrap();
        assert_eq!(bytes, [0x02, 0x01, 0x06, 0x05, 0x04, 0x03]);
    }

    #[test]
    fn test_big_endian_prefixes() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Tagged {
            name: String,
            values: Vec<u16>,
        }
        let codec = FieldCodec::new(CodecConfig::new().with_byte_order(ByteOrder::Big));
        let original = Tagged {
            name: "a".to_string(),
            values: vec![0x0102],
        };
        let bytes = codec.encode(&original).unwrap();
        assert_eq!(bytes, [0x00, 0x01, b'a', 0x00, 0x00, 0x00, 0x01, 0x01, 0x02]);
        assert_eq!(codec.decode::<Tagged>(&bytes).unwrap(), original);
    }

    #[test]
    fn test_fixed_aggregates_have_no_prefix() {
        let shape = Shape {
            label: String::new(),
            origin: Point { x: 1, y: -1 },
            vertices: vec![Point { x: 2, y: 3 }],
            color: [0x10, 0x20, 0x30],
            span: (9, 0x0A0B),
        };
        let bytes = codec().encode(&shape).unwrap();
        assert_eq!(
            bytes,
            [
                0x00, 0x00, // label: empty text
                0x01, 0x00, 0xFF, 0xFF, // origin
                0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x03, 0x00, // vertices
                0x10, 0x20, 0x30, // color
                0x09, 0x0B, 0x0A, // span
            ]
        );
        assert_eq!(codec().decode::<Shape>(&bytes).unwrap(), shape);
    }

    #[test]
    fn test_empty_sequence_and_text() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Empty {
            name: String,
            values: Vec<u64>,
        }
        let original = Empty {
            name: String::new(),
            values: Vec::new(),
        };
        let bytes = codec().encode(&original).unwrap();
        assert_eq!(bytes, [0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(codec().decode::<Empty>(&bytes).unwrap(), original);
    }

    #[test]
    fn test_text_counts_utf8_bytes() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Greeting {
            text: String,
        }
        let original = Greeting {
            text: "héllo".to_string(),
        };
        let bytes = codec().encode(&original).unwrap();
        assert_eq!(&bytes[..2], &[0x06, 0x00]);
        assert_eq!(codec().decode::<Greeting>(&bytes).unwrap(), original);
    }

    #[test]
    fn test_unsupported_option_names_field() {
        #[derive(Serialize)]
        struct WithOption {
            id: u8,
            nickname: Option<String>,
        }
        let err = codec()
            .encode(&WithOption {
                id: 1,
                nickname: None,
            })
            .unwrap_err();
        match err {
            CodecError::UnsupportedFieldType {
                field, type_name, ..
            } => {
                assert_eq!(field, "nickname");
                assert!(type_name.contains("Option"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_field_leaves_only_prior_fields() {
        #[derive(Serialize)]
        struct Mixed {
            id: u8,
            words: Vec<String>,
            tail: u8,
        }
        let mut sink = Vec::new();
        let err = codec()
            .encode_to(
                &mut sink,
                &Mixed {
                    id: 0x42,
                    words: vec!["a".to_string()],
                    tail: 1,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedFieldType { ref field, .. } if field == "words"));
        assert_eq!(sink, [0x42]);
    }

    #[test]
    fn test_unsupported_shapes() {
        #[derive(Serialize)]
        struct WithMap {
            map: HashMap<u8, u8>,
        }
        #[derive(Serialize)]
        enum Mode {
            Fast,
        }
        #[derive(Serialize)]
        struct WithEnum {
            mode: Mode,
        }
        #[derive(Serialize)]
        struct Nested {
            matrix: Vec<Vec<u8>>,
        }
        #[derive(Serialize)]
        struct Inner {
            text: String,
        }
        #[derive(Serialize)]
        struct WithTextRecord {
            inner: Inner,
        }

        let map = WithMap {
            map: HashMap::from([(1, 2)]),
        };
        assert!(matches!(
            codec().encode(&map),
            Err(CodecError::UnsupportedFieldType { .. })
        ));
        assert!(matches!(
            codec().encode(&WithEnum { mode: Mode::Fast }),
            Err(CodecError::UnsupportedFieldType { .. })
        ));
        assert!(matches!(
            codec().encode(&Nested {
                matrix: vec![vec![1]]
            }),
            Err(CodecError::UnsupportedFieldType { .. })
        ));
        assert!(matches!(
            codec().encode(&WithTextRecord {
                inner: Inner {
                    text: "x".to_string()
                }
            }),
            Err(CodecError::UnsupportedFieldType { .. })
        ));
    }

    #[test]
    fn test_body_must_be_record() {
        let err = codec().encode(&42u32).unwrap_err();
        match err {
            CodecError::UnsupportedFieldType { field, type_name, .. } => {
                assert_eq!(field, BODY);
                assert_eq!(type_name, "u32");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tuple_and_newtype_bodies() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Wrapper(Point);

        let bytes = codec().encode(&(1u8, "hi".to_string())).unwrap();
        assert_eq!(bytes, [0x01, 0x02, 0x00, b'h', b'i']);
        let decoded: (u8, String) = codec().decode(&bytes).unwrap();
        assert_eq!(decoded, (1, "hi".to_string()));

        let wrapped = Wrapper(Point { x: 5, y: 6 });
        let bytes = codec().encode(&wrapped).unwrap();
        assert_eq!(bytes, [0x05, 0x00, 0x06, 0x00]);
        assert_eq!(codec().decode::<Wrapper>(&bytes).unwrap(), wrapped);
    }

    #[test]
    fn test_text_too_long() {
        #[derive(Serialize)]
        struct Big {
            text: String,
        }
        let err = codec()
            .encode(&Big {
                text: "x".repeat(70_000),
            })
            .unwrap_err();
        assert!(matches!(err, CodecError::TextTooLong { len: 70_000, .. }));
    }

    #[test]
    fn test_sequence_limit_on_encode_and_decode() {
        #[derive(Serialize, Deserialize, Debug)]
        struct Values {
            values: Vec<u8>,
        }
        let limited = FieldCodec::new(CodecConfig::new().with_max_sequence_len(2));
        let err = limited
            .encode(&Values {
                values: vec![1, 2, 3],
            })
            .unwrap_err();
        assert!(matches!(err, CodecError::SequenceTooLong { len: 3, max: 2 }));

        let bytes = codec()
            .encode(&Values {
                values: vec![1, 2, 3],
            })
            .unwrap();
        let err = limited.decode::<Values>(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::SequenceTooLong { len: 3, max: 2 }));
    }

    #[test]
    fn test_byte_buffer_field() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Blob {
            #[serde(with = "serde_bytes")]
            data: Vec<u8>,
        }
        let original = Blob {
            data: vec![0xDE, 0xAD],
        };
        let bytes = codec().encode(&original).unwrap();
        assert_eq!(bytes, [0x02, 0x00, 0x00, 0x00, 0xDE, 0xAD]);
        assert_eq!(codec().decode::<Blob>(&bytes).unwrap(), original);
    }

    #[test]
    fn test_byte_buffer_oversized_prefix_is_io_error() {
        #[derive(Deserialize, Debug)]
        struct Blob {
            #[allow(dead_code)]
            #[serde(with = "serde_bytes")]
            data: Vec<u8>,
        }
        // Announces 0x3FFFFFFF bytes, delivers one.
        let mut cursor = Cursor::new(vec![0xFF, 0xFF, 0xFF, 0x3F, 0x01]);
        let err = codec().decode_from::<_, Blob>(&mut cursor).unwrap_err();
        match err {
            CodecError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn test_decode_invalid_utf8() {
        #[derive(Deserialize, Debug)]
        struct Named {
            #[allow(dead_code)]
            name: String,
        }
        let err = codec().decode::<Named>(&[0x01, 0x00, 0xFF]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidText(_)));
    }

    #[test]
    fn test_decode_truncated_stream_is_io_error() {
        let mut cursor = Cursor::new(vec![0x01, 0x00]);
        let err = codec().decode_from::<_, Point>(&mut cursor).unwrap_err();
        match err {
            CodecError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_consumes_exactly_the_body() {
        let mut cursor = Cursor::new(vec![0x01, 0x00, 0x02, 0x00, 0x99]);
        let point: Point = codec().decode_from(&mut cursor).unwrap();
        assert_eq!(point, Point { x: 1, y: 2 });
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_bool_decodes_nonzero_as_true() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Flag {
            on: bool,
        }
        assert_eq!(codec().decode::<Flag>(&[0x07]).unwrap(), Flag { on: true });
        assert_eq!(codec().decode::<Flag>(&[0x00]).unwrap(), Flag { on: false });
    }

    #[test]
    fn test_decode_invalid_char() {
        #[derive(Deserialize, Debug)]
        struct Letter {
            #[allow(dead_code)]
            c: char,
        }
        let err = codec()
            .decode::<Letter>(&[0x00, 0xD8, 0x00, 0x00])
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidChar(0xD800)));
    }
}
