// ABOUTME: Serde Serializer implementation for BSON encoding.
// ABOUTME: Encodes any serde-serializable map or struct as a BSON document.

use crate::decoder::{decode_payload, payload_len};
use crate::encoder::{DocumentStart, Encoder};
use crate::error::{Error, Result};
use crate::types::element_type;
use serde::ser::{self, Impossible, Serialize};

/// Newtype name that marks a pre-encoded element (`[tag] ++ payload`).
///
/// The special BSON types serialize through this marker so they can pick
/// their own tag; other serializers see an ordinary byte buffer.
pub(crate) const RAW_ELEMENT_NAME: &str = "$__serde_bson_private_raw_element";

/// Serialize a pre-encoded element. `write` appends the payload after `tag`.
pub(crate) fn serialize_raw_element<S, F>(serializer: S, tag: u8, write: F) -> std::result::Result<S::Ok, S::Error>
where
    S: ser::Serializer,
    F: FnOnce(&mut Encoder) -> Result<()>,
{
    let mut encoder = Encoder::new();
    encoder.write_byte(tag);
    write(&mut encoder).map_err(<S::Error as ser::Error>::custom)?;
    serializer.serialize_newtype_struct(RAW_ELEMENT_NAME, &RawBytes(encoder.as_bytes()))
}

struct RawBytes<'a>(&'a [u8]);

impl Serialize for RawBytes<'_> {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

/// Write a pre-encoded element under `key` after checking that its payload
/// is exactly one well-formed value of its tag.
fn write_raw_element(encoder: &mut Encoder, key: &str, raw: &[u8]) -> Result<()> {
    let (&tag, payload) = raw.split_first().ok_or(Error::Corrupt("raw element"))?;
    if payload_len(tag, payload)? != payload.len() {
        return Err(Error::Corrupt(element_type::name(tag)));
    }
    decode_payload(tag, payload)?;
    encoder.write_element_header(tag, key)?;
    encoder.write_bytes(payload);
    Ok(())
}

/// A serde Serializer that writes one top-level BSON document.
///
/// Only maps, structs, and enum variants carrying data are accepted at the
/// top level; everything else is rejected before any bytes are written.
pub struct Serializer<'a> {
    encoder: &'a mut Encoder,
}

impl<'a> Serializer<'a> {
    /// Create a new Serializer wrapping an Encoder.
    pub fn new(encoder: &'a mut Encoder) -> Self {
        Self { encoder }
    }
}

fn not_a_document<T>(kind: &str) -> Result<T> {
    Err(Error::InvalidSource(kind.to_string()))
}

impl<'b> ser::Serializer for &'b mut Serializer<'_> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = ArraySerializer<'b>;
    type SerializeMap = DocumentSerializer<'b>;
    type SerializeStruct = DocumentSerializer<'b>;
    type SerializeStructVariant = DocumentSerializer<'b>;

    fn serialize_bool(self, _v: bool) -> Result<()> {
        not_a_document("boolean")
    }

    fn serialize_i8(self, _v: i8) -> Result<()> {
        not_a_document("int32")
    }

    fn serialize_i16(self, _v: i16) -> Result<()> {
        not_a_document("int32")
    }

    fn serialize_i32(self, _v: i32) -> Result<()> {
        not_a_document("int32")
    }

    fn serialize_i64(self, _v: i64) -> Result<()> {
        not_a_document("int64")
    }

    fn serialize_u8(self, _v: u8) -> Result<()> {
        not_a_document("int32")
    }

    fn serialize_u16(self, _v: u16) -> Result<()> {
        not_a_document("int32")
    }

    fn serialize_u32(self, _v: u32) -> Result<()> {
        not_a_document("int64")
    }

    fn serialize_u64(self, _v: u64) -> Result<()> {
        not_a_document("int64")
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        not_a_document("double")
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        not_a_document("double")
    }

    fn serialize_char(self, _v: char) -> Result<()> {
        not_a_document("utf8 string")
    }

    fn serialize_str(self, _v: &str) -> Result<()> {
        not_a_document("utf8 string")
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        not_a_document("binary")
    }

    fn serialize_none(self) -> Result<()> {
        Err(Error::EncodeNil)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Err(Error::EncodeNil)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Err(Error::EncodeNil)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        not_a_document("utf8 string")
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<()> {
        if name == RAW_ELEMENT_NAME {
            return not_a_document("bson scalar");
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        let start = self.encoder.begin_document();
        value.serialize(ElementSerializer::new(self.encoder, variant))?;
        self.encoder.end_document(start)?;
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        not_a_document("array")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        not_a_document("array")
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        not_a_document("array")
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        let outer = self.encoder.begin_document();
        self.encoder.write_element_header(element_type::ARRAY, variant)?;
        Ok(ArraySerializer::begin(self.encoder, Some(outer)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(DocumentSerializer::begin(self.encoder, None))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(DocumentSerializer::begin(self.encoder, None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        let outer = self.encoder.begin_document();
        self.encoder.write_element_header(element_type::DOCUMENT, variant)?;
        Ok(DocumentSerializer::begin(self.encoder, Some(outer)))
    }
}

/// Serializes one value as an element named `key`.
///
/// The type tag and name are written once the value's type is known.
pub struct ElementSerializer<'a, 'k> {
    encoder: &'a mut Encoder,
    key: &'k str,
    raw: bool,
}

impl<'a, 'k> ElementSerializer<'a, 'k> {
    fn new(encoder: &'a mut Encoder, key: &'k str) -> Self {
        Self {
            encoder,
            key,
            raw: false,
        }
    }

    #[inline]
    fn header(&mut self, tag: u8) -> Result<()> {
        self.encoder.write_element_header(tag, self.key)
    }
}

impl<'a> ser::Serializer for ElementSerializer<'a, '_> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = ArraySerializer<'a>;
    type SerializeTuple = ArraySerializer<'a>;
    type SerializeTupleStruct = ArraySerializer<'a>;
    type SerializeTupleVariant = ArraySerializer<'a>;
    type SerializeMap = DocumentSerializer<'a>;
    type SerializeStruct = DocumentSerializer<'a>;
    type SerializeStructVariant = DocumentSerializer<'a>;

    fn serialize_bool(mut self, v: bool) -> Result<()> {
        self.header(element_type::BOOLEAN)?;
        self.encoder.write_bool(v);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i32(i32::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i32(i32::from(v))
    }

    fn serialize_i32(mut self, v: i32) -> Result<()> {
        self.header(element_type::INT32)?;
        self.encoder.write_i32(v);
        Ok(())
    }

    fn serialize_i64(mut self, v: i64) -> Result<()> {
        self.header(element_type::INT64)?;
        self.encoder.write_i64(v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_i32(i32::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_i32(i32::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        match i64::try_from(v) {
            Ok(v) => self.serialize_i64(v),
            Err(_) => Err(Error::UnsupportedType(format!("u64 value {v} exceeds int64"))),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(mut self, v: f64) -> Result<()> {
        self.header(element_type::DOUBLE)?;
        self.encoder.write_f64(v);
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.serialize_str(v.encode_utf8(&mut buf))
    }

    fn serialize_str(mut self, v: &str) -> Result<()> {
        self.header(element_type::STRING)?;
        self.encoder.write_string(v)
    }

    fn serialize_bytes(mut self, v: &[u8]) -> Result<()> {
        if self.raw {
            return write_raw_element(self.encoder, self.key, v);
        }
        self.header(element_type::BINARY)?;
        self.encoder.write_binary(crate::types::binary_subtype::GENERIC, v)
    }

    fn serialize_none(mut self) -> Result<()> {
        self.header(element_type::NULL)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(mut self) -> Result<()> {
        self.header(element_type::NULL)
    }

    fn serialize_unit_struct(mut self, _name: &'static str) -> Result<()> {
        self.header(element_type::NULL)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        mut self,
        name: &'static str,
        value: &T,
    ) -> Result<()> {
        self.raw = name == RAW_ELEMENT_NAME;
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        mut self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.header(element_type::DOCUMENT)?;
        let start = self.encoder.begin_document();
        value.serialize(ElementSerializer::new(&mut *self.encoder, variant))?;
        self.encoder.end_document(start)?;
        Ok(())
    }

    fn serialize_seq(mut self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.header(element_type::ARRAY)?;
        Ok(ArraySerializer::begin(self.encoder, None))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        mut self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.header(element_type::DOCUMENT)?;
        let outer = self.encoder.begin_document();
        self.encoder.write_element_header(element_type::ARRAY, variant)?;
        Ok(ArraySerializer::begin(self.encoder, Some(outer)))
    }

    fn serialize_map(mut self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.header(element_type::DOCUMENT)?;
        Ok(DocumentSerializer::begin(self.encoder, None))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.serialize_map(None)
    }

    fn serialize_struct_variant(
        mut self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.header(element_type::DOCUMENT)?;
        let outer = self.encoder.begin_document();
        self.encoder.write_element_header(element_type::DOCUMENT, variant)?;
        Ok(DocumentSerializer::begin(self.encoder, Some(outer)))
    }
}

/// Writes the elements of an open document. `outer` is the enclosing
/// single-key document of an enum variant, closed together with this one.
pub struct DocumentSerializer<'a> {
    encoder: &'a mut Encoder,
    start: DocumentStart,
    outer: Option<DocumentStart>,
    key: Option<String>,
}

impl<'a> DocumentSerializer<'a> {
    fn begin(encoder: &'a mut Encoder, outer: Option<DocumentStart>) -> Self {
        let start = encoder.begin_document();
        Self {
            encoder,
            start,
            outer,
            key: None,
        }
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        value.serialize(ElementSerializer::new(&mut *self.encoder, key))
    }

    fn finish(self) -> Result<()> {
        self.encoder.end_document(self.start)?;
        if let Some(outer) = self.outer {
            self.encoder.end_document(outer)?;
        }
        Ok(())
    }
}

impl ser::SerializeMap for DocumentSerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .key
            .take()
            .ok_or_else(|| Error::Custom("map value serialized before its key".into()))?;
        self.field(&key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStruct for DocumentSerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for DocumentSerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Writes a sequence as a document keyed "0", "1", ...
pub struct ArraySerializer<'a> {
    encoder: &'a mut Encoder,
    start: DocumentStart,
    outer: Option<DocumentStart>,
    index: usize,
}

impl<'a> ArraySerializer<'a> {
    fn begin(encoder: &'a mut Encoder, outer: Option<DocumentStart>) -> Self {
        let start = encoder.begin_document();
        Self {
            encoder,
            start,
            outer,
            index: 0,
        }
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self.index.to_string();
        value.serialize(ElementSerializer::new(&mut *self.encoder, &key))?;
        self.index += 1;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        self.encoder.end_document(self.start)?;
        if let Some(outer) = self.outer {
            self.encoder.end_document(outer)?;
        }
        Ok(())
    }
}

impl ser::SerializeSeq for ArraySerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTuple for ArraySerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for ArraySerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for ArraySerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// A helper serializer that renders map keys as field names.
struct KeySerializer;

fn key_error<T>(kind: &str) -> Result<T> {
    Err(Error::UnsupportedType(format!("{kind} as document key")))
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = Error;
    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Ok(v.to_string())
    }
    fn serialize_i16(self, v: i16) -> Result<String> {
        Ok(v.to_string())
    }
    fn serialize_i32(self, v: i32) -> Result<String> {
        Ok(v.to_string())
    }
    fn serialize_i64(self, v: i64) -> Result<String> {
        Ok(v.to_string())
    }
    fn serialize_u8(self, v: u8) -> Result<String> {
        Ok(v.to_string())
    }
    fn serialize_u16(self, v: u16) -> Result<String> {
        Ok(v.to_string())
    }
    fn serialize_u32(self, v: u32) -> Result<String> {
        Ok(v.to_string())
    }
    fn serialize_u64(self, v: u64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_bool(self, _v: bool) -> Result<String> {
        key_error("boolean")
    }
    fn serialize_f32(self, _v: f32) -> Result<String> {
        key_error("double")
    }
    fn serialize_f64(self, _v: f64) -> Result<String> {
        key_error("double")
    }
    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        key_error("binary")
    }
    fn serialize_none(self) -> Result<String> {
        key_error("null")
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<String> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<String> {
        key_error("null")
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        key_error("null")
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<String> {
        if name == RAW_ELEMENT_NAME {
            return key_error("bson scalar");
        }
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String> {
        key_error("enum variant")
    }
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        key_error("array")
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        key_error("array")
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        key_error("array")
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        key_error("enum variant")
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        key_error("document")
    }
    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        key_error("document")
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        key_error("enum variant")
    }
}
