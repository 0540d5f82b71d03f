//! Field encoder.
//!
//! A serde `Serializer` that accepts exactly the three wire shapes. Each
//! top-level field is rendered into a scratch buffer first and handed to the
//! sink only once it is complete, so a rejected field never leaves a
//! half-written prefix behind.

use std::any::type_name;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use serde::ser::{self, Impossible, Serialize};

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::protocol::MAX_TEXT_LEN;

const NOT_A_RECORD: &str = "body is not a record";

/// Walks the fields of a record, writing each finished field to the sink.
pub(crate) struct RecordSerializer<'a, W: ?Sized> {
    writer: &'a mut W,
    scratch: BytesMut,
    config: CodecConfig,
    index: usize,
}

impl<'a, W: Write + ?Sized> RecordSerializer<'a, W> {
    pub(crate) fn new(writer: &'a mut W, config: CodecConfig) -> Self {
        Self {
            writer,
            scratch: BytesMut::with_capacity(256),
            config,
            index: 0,
        }
    }

    fn field<T: ?Sized + Serialize>(&mut self, name: &str, value: &T) -> Result<()> {
        self.scratch.clear();
        value
            .serialize(ValueSerializer::new(&mut self.scratch, self.config, false))
            .map_err(|e| e.in_field(name, type_name::<T>()))?;
        self.writer.write_all(&self.scratch)?;
        self.index += 1;
        Ok(())
    }

    fn positional<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let name = self.index.to_string();
        self.field(&name, value)
    }
}

macro_rules! reject_scalars {
    ($shape:expr; $($method:ident($ty:ty);)*) => {
        $(
            fn $method(self, _v: $ty) -> Result<()> {
                Err(CodecError::unsupported($shape))
            }
        )*
    };
}

impl<'s, 'a, W: Write + ?Sized> ser::Serializer for &'s mut RecordSerializer<'a, W> {
    type Ok = ();
    type Error = CodecError;

    type SerializeSeq = Impossible<(), CodecError>;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Impossible<(), CodecError>;
    type SerializeMap = Impossible<(), CodecError>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), CodecError>;

    fn is_human_readable(&self) -> bool {
        false
    }

    reject_scalars! { NOT_A_RECORD;
        serialize_bool(bool);
        serialize_i8(i8);
        serialize_i16(i16);
        serialize_i32(i32);
        serialize_i64(i64);
        serialize_i128(i128);
        serialize_u8(u8);
        serialize_u16(u16);
        serialize_u32(u32);
        serialize_u64(u64);
        serialize_u128(u128);
        serialize_f32(f32);
        serialize_f64(f64);
        serialize_char(char);
        serialize_str(&str);
        serialize_bytes(&[u8]);
    }

    fn serialize_none(self) -> Result<()> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<()> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }

    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<()> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }
}

impl<'s, 'a, W: Write + ?Sized> ser::SerializeStruct for &'s mut RecordSerializer<'a, W> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'s, 'a, W: Write + ?Sized> ser::SerializeTuple for &'s mut RecordSerializer<'a, W> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.positional(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'s, 'a, W: Write + ?Sized> ser::SerializeTupleStruct for &'s mut RecordSerializer<'a, W> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.positional(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Serializes one field value into the scratch buffer.
///
/// `nested` is set inside sequences and fixed-size aggregates, where only
/// fixed-width members are allowed.
pub(crate) struct ValueSerializer<'b> {
    buf: &'b mut BytesMut,
    config: CodecConfig,
    nested: bool,
}

impl<'b> ValueSerializer<'b> {
    fn new(buf: &'b mut BytesMut, config: CodecConfig, nested: bool) -> Self {
        Self {
            buf,
            config,
            nested,
        }
    }

    fn check_sequence_len(&self, len: usize) -> Result<()> {
        if len > self.config.max_sequence_len as usize {
            return Err(CodecError::SequenceTooLong {
                len,
                max: self.config.max_sequence_len,
            });
        }
        Ok(())
    }
}

impl<'b> ser::Serializer for ValueSerializer<'b> {
    type Ok = ();
    type Error = CodecError;

    type SerializeSeq = SequenceEncoder<'b>;
    type SerializeTuple = FixedEncoder<'b>;
    type SerializeTupleStruct = FixedEncoder<'b>;
    type SerializeTupleVariant = Impossible<(), CodecError>;
    type SerializeMap = Impossible<(), CodecError>;
    type SerializeStruct = FixedEncoder<'b>;
    type SerializeStructVariant = Impossible<(), CodecError>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.buf.put_u8(v as u8);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.buf.put_i8(v);
        Ok(())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.config.byte_order.put_i16(self.buf, v);
        Ok(())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.config.byte_order.put_i32(self.buf, v);
        Ok(())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.config.byte_order.put_i64(self.buf, v);
        Ok(())
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        self.config.byte_order.put_i128(self.buf, v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.buf.put_u8(v);
        Ok(())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.config.byte_order.put_u16(self.buf, v);
        Ok(())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.config.byte_order.put_u32(self.buf, v);
        Ok(())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.config.byte_order.put_u64(self.buf, v);
        Ok(())
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        self.config.byte_order.put_u128(self.buf, v);
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.config.byte_order.put_f32(self.buf, v);
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.config.byte_order.put_f64(self.buf, v);
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.config.byte_order.put_u32(self.buf, v as u32);
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        if self.nested {
            return Err(CodecError::unsupported("text inside a sequence or fixed-size value"));
        }
        if v.len() > MAX_TEXT_LEN {
            return Err(CodecError::TextTooLong {
                len: v.len(),
                max: MAX_TEXT_LEN,
            });
        }
        self.config.byte_order.put_u16(self.buf, v.len() as u16);
        self.buf.put_slice(v.as_bytes());
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        if self.nested {
            return Err(CodecError::unsupported("sequence inside a sequence or fixed-size value"));
        }
        self.check_sequence_len(v.len())?;
        self.config.byte_order.put_u32(self.buf, v.len() as u32);
        self.buf.put_slice(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        Err(CodecError::unsupported("optional value"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<()> {
        Err(CodecError::unsupported("optional value"))
    }

    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<()> {
        Err(CodecError::unsupported("enum variant"))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(CodecError::unsupported("enum variant"))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        if self.nested {
            return Err(CodecError::unsupported("sequence inside a sequence or fixed-size value"));
        }
        if let Some(len) = len {
            self.check_sequence_len(len)?;
        }
        // Count is backpatched in `end`, which also covers unsized iterators.
        let start = self.buf.len();
        self.buf.put_u32(0);
        Ok(SequenceEncoder {
            buf: self.buf,
            config: self.config,
            start,
            count: 0,
        })
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Ok(FixedEncoder {
            buf: self.buf,
            config: self.config,
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(FixedEncoder {
            buf: self.buf,
            config: self.config,
        })
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(CodecError::unsupported("enum variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(CodecError::unsupported("map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(FixedEncoder {
            buf: self.buf,
            config: self.config,
        })
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(CodecError::unsupported("enum variant"))
    }
}

/// Variable-length sequence: 4-byte element count, then each element.
pub(crate) struct SequenceEncoder<'b> {
    buf: &'b mut BytesMut,
    config: CodecConfig,
    start: usize,
    count: usize,
}

impl<'b> ser::SerializeSeq for SequenceEncoder<'b> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(ValueSerializer::new(self.buf, self.config, true))?;
        self.count += 1;
        Ok(())
    }

    fn end(self) -> Result<()> {
        if self.count > self.config.max_sequence_len as usize {
            return Err(CodecError::SequenceTooLong {
                len: self.count,
                max: self.config.max_sequence_len,
            });
        }
        self.config
            .byte_order
            .patch_u32(self.buf, self.start, self.count as u32);
        Ok(())
    }
}

/// Fixed-size aggregate (array, tuple, nested record): members back to back.
pub(crate) struct FixedEncoder<'b> {
    buf: &'b mut BytesMut,
    config: CodecConfig,
}

impl<'b> FixedEncoder<'b> {
    fn member<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(ValueSerializer::new(self.buf, self.config, true))
    }
}

impl<'b> ser::SerializeTuple for FixedEncoder<'b> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.member(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'b> ser::SerializeTupleStruct for FixedEncoder<'b> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.member(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'b> ser::SerializeStruct for FixedEncoder<'b> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Result<()> {
        self.member(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}
