//! Field decoder.
//!
//! The mirror of [`ser`](super::ser): a serde `Deserializer` driven by the
//! record's own type hints. Variable-length shapes read their prefix first and
//! then exactly that many elements; fixed shapes read straight from the stream.

use std::any::type_name;
use std::io::Read;

use serde::de::{DeserializeSeed, Deserializer, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::protocol::read_u8;

const NOT_A_RECORD: &str = "body is not a record";

/// Up-front capacity for a length-prefixed read; larger values grow on demand.
const INITIAL_READ_CAPACITY: usize = 8 * 1024;

/// Reads the fields of a record in declaration order.
pub(crate) struct RecordDeserializer<'a, R: ?Sized> {
    reader: &'a mut R,
    config: CodecConfig,
}

impl<'a, R: Read + ?Sized> RecordDeserializer<'a, R> {
    pub(crate) fn new(reader: &'a mut R, config: CodecConfig) -> Self {
        Self { reader, config }
    }
}

impl<'de, 's, 'a, R: Read + ?Sized> Deserializer<'de> for &'s mut RecordDeserializer<'a, R> {
    type Error = CodecError;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(CodecError::unsupported(NOT_A_RECORD))
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        visitor.visit_seq(FieldAccess {
            de: self,
            names: &[],
            index: 0,
            len,
        })
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_seq(FieldAccess {
            de: self,
            names: fields,
            index: 0,
            len: fields.len(),
        })
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option seq map enum identifier ignored_any
    }
}

struct FieldAccess<'s, 'a, R: ?Sized> {
    de: &'s mut RecordDeserializer<'a, R>,
    names: &'static [&'static str],
    index: usize,
    len: usize,
}

impl<'s, 'a, R: ?Sized> FieldAccess<'s, 'a, R> {
    fn field_name(&self) -> String {
        match self.names.get(self.index) {
            Some(name) => (*name).to_string(),
            None => self.index.to_string(),
        }
    }
}

impl<'de, 's, 'a, R: Read + ?Sized> SeqAccess<'de> for FieldAccess<'s, 'a, R> {
    type Error = CodecError;

    fn next_element_seed<S: DeserializeSeed<'de>>(&mut self, seed: S) -> Result<Option<S::Value>> {
        if self.index == self.len {
            return Ok(None);
        }
        let decoded = seed.deserialize(ValueDeserializer::new(
            &mut *self.de.reader,
            self.de.config,
            false,
        ));
        match decoded {
            Ok(value) => {
                self.index += 1;
                Ok(Some(value))
            }
            Err(e) => Err(e.in_field(&self.field_name(), type_name::<S::Value>())),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len - self.index)
    }
}

/// Decodes one field value. `nested` restricts it to fixed-width members.
pub(crate) struct ValueDeserializer<'b, R: ?Sized> {
    reader: &'b mut R,
    config: CodecConfig,
    nested: bool,
}

impl<'b, R: Read + ?Sized> ValueDeserializer<'b, R> {
    fn new(reader: &'b mut R, config: CodecConfig, nested: bool) -> Self {
        Self {
            reader,
            config,
            nested,
        }
    }

    fn read_sequence_len(&mut self) -> Result<usize> {
        let len = self.config.byte_order.read_u32(self.reader)?;
        if len > self.config.max_sequence_len {
            return Err(CodecError::SequenceTooLong {
                len: len as usize,
                max: self.config.max_sequence_len,
            });
        }
        Ok(len as usize)
    }

    /// Read exactly `len` bytes. The buffer grows with the bytes actually
    /// received, so a corrupt prefix cannot force a large allocation.
    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(len.min(INITIAL_READ_CAPACITY));
        (&mut *self.reader).take(len as u64).read_to_end(&mut raw)?;
        if raw.len() < len {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        Ok(raw)
    }

    fn fixed<'de, V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        visitor.visit_seq(ElementAccess {
            reader: self.reader,
            config: self.config,
            remaining: len,
        })
    }
}

impl<'de, 'b, R: Read + ?Sized> Deserializer<'de> for ValueDeserializer<'b, R> {
    type Error = CodecError;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(CodecError::unsupported("self-describing value"))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_bool(read_u8(self.reader)? != 0)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i8(read_u8(self.reader)? as i8)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i16(self.config.byte_order.read_i16(self.reader)?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i32(self.config.byte_order.read_i32(self.reader)?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.config.byte_order.read_i64(self.reader)?)
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i128(self.config.byte_order.read_i128(self.reader)?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u8(read_u8(self.reader)?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u16(self.config.byte_order.read_u16(self.reader)?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u32(self.config.byte_order.read_u32(self.reader)?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u64(self.config.byte_order.read_u64(self.reader)?)
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u128(self.config.byte_order.read_u128(self.reader)?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(self.config.byte_order.read_f32(self.reader)?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(self.config.byte_order.read_f64(self.reader)?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let raw = self.config.byte_order.read_u32(self.reader)?;
        let c = char::from_u32(raw).ok_or(CodecError::InvalidChar(raw))?;
        visitor.visit_char(c)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
        if self.nested {
            return Err(CodecError::unsupported("text inside a sequence or fixed-size value"));
        }
        let len = self.config.byte_order.read_u16(self.reader)? as usize;
        let raw = self.read_exact_vec(len)?;
        visitor.visit_string(String::from_utf8(raw)?)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
        if self.nested {
            return Err(CodecError::unsupported("sequence inside a sequence or fixed-size value"));
        }
        let len = self.read_sequence_len()?;
        let raw = self.read_exact_vec(len)?;
        visitor.visit_byte_buf(raw)
    }

    fn deserialize_option<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(CodecError::unsupported("optional value"))
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
        if self.nested {
            return Err(CodecError::unsupported("sequence inside a sequence or fixed-size value"));
        }
        let len = self.read_sequence_len()?;
        self.fixed(len, visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        self.fixed(len, visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.fixed(len, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(CodecError::unsupported("map"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.fixed(fields.len(), visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(CodecError::unsupported("enum variant"))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(CodecError::unsupported("identifier"))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(CodecError::unsupported("self-describing value"))
    }
}

/// Elements of a sequence or fixed-size aggregate, all fixed-width.
struct ElementAccess<'b, R: ?Sized> {
    reader: &'b mut R,
    config: CodecConfig,
    remaining: usize,
}

impl<'de, 'b, R: Read + ?Sized> SeqAccess<'de> for ElementAccess<'b, R> {
    type Error = CodecError;

    fn next_element_seed<S: DeserializeSeed<'de>>(&mut self, seed: S) -> Result<Option<S::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(ValueDeserializer::new(&mut *self.reader, self.config, true))
            .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}
