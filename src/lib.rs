// ABOUTME: BSON (Binary JSON) document encoder/decoder for Rust.
// ABOUTME: Provides serde integration, a dynamic Document model, and length-prefixed stream framing.

//! # serde_bson
//!
//! An encoder and decoder for BSON, the length-prefixed, type-tagged binary
//! document format used by MongoDB.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_bson::{to_vec, from_slice};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! let person = Person {
//!     name: "Alice".to_string(),
//!     age: 30,
//! };
//!
//! // Serialize to BSON
//! let bytes = to_vec(&person).unwrap();
//!
//! // Deserialize from BSON
//! let decoded: Person = from_slice(&bytes).unwrap();
//! assert_eq!(person, decoded);
//! ```
//!
//! ## Working with Dynamic Documents
//!
//! ```rust
//! use serde_bson::{decode_document, doc, encode_document};
//!
//! let document = doc! {
//!     "name": "test",
//!     "values": [1, 2, 3],
//!     "active": true
//! };
//!
//! let bytes = encode_document(&document).unwrap();
//! assert_eq!(decode_document(&bytes).unwrap(), document);
//! ```
//!
//! ## Streams
//!
//! [`stream::StreamDecoder`] and [`stream::StreamEncoder`] read and write
//! one whole document at a time over any `Read` or `Write`.
//!
//! ## Decoding Rules
//!
//! - The top level of every document must decode into a map or struct.
//! - Repeated field names keep the last value unless
//!   [`DecoderConfig::duplicate_key_mode`] says otherwise.
//! - Array keys must be exactly `"0"` to `"n-1"`; any order is accepted.
//! - A failed [`decode_document_into`] leaves the fields decoded so far in
//!   the target document.
//!
//! ## Resource Limits
//!
//! - Maximum document size: `i32::MAX` bytes (the length header is an int32)
//! - Maximum nesting depth: 100, matching MongoDB's limit

pub mod de;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod ser;
pub mod stream;
pub mod types;
pub mod value;

// Re-export commonly used items at the crate root
pub use de::{from_slice, from_slice_with_config, Deserializer};
pub use decoder::{DecodedValue, DecoderConfig, DuplicateKeyMode, Element, ElementCursor};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use ser::Serializer;
pub use stream::{StreamDecoder, StreamEncoder};
pub use types::{
    binary_subtype, element_type, limits, Binary, DateTime, DbPointer, Decimal128, JavaScriptCodeWithScope,
    ObjectId, Regex, Timestamp,
};
pub use value::{Document, Value};

// The bson! and doc! macros are exported at crate root via #[macro_export]

use decoder::{array_elements, decode_payload, document_elements, payload_len};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Serialize a map or struct to a BSON document.
///
/// # Example
///
/// ```rust
/// use serde_bson::to_vec;
/// use std::collections::BTreeMap;
///
/// let mut map = BTreeMap::new();
/// map.insert("int", 1i32);
/// let bytes = to_vec(&map).unwrap();
/// assert_eq!(bytes, b"\x0e\x00\x00\x00\x10int\x00\x01\x00\x00\x00\x00");
/// ```
pub fn to_vec<T: ?Sized + Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    value.serialize(&mut Serializer::new(&mut encoder))?;
    Ok(encoder.into_inner())
}

/// Serialize a map or struct to a writer as one BSON document.
///
/// The document is built in memory first, so nothing is written if encoding fails.
pub fn to_writer<W: Write, T: ?Sized + Serialize>(mut writer: W, value: &T) -> Result<()> {
    let bytes = to_vec(value)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Decode a BSON document into a [`Document`].
///
/// # Example
///
/// ```rust
/// use serde_bson::decode_document;
///
/// let bytes = b"\x16\x00\x00\x00\x02hello\x00\x06\x00\x00\x00world\x00\x00";
/// let document = decode_document(bytes).unwrap();
/// assert_eq!(document.get_str("hello"), Some("world"));
/// ```
pub fn decode_document(data: &[u8]) -> Result<Document> {
    decode_document_with_config(data, DecoderConfig::default())
}

/// Decode a BSON document into a [`Document`] with custom configuration.
pub fn decode_document_with_config(data: &[u8], config: DecoderConfig) -> Result<Document> {
    let mut document = Document::new();
    decode_into(data, &mut document, &config)?;
    Ok(document)
}

/// Decode a BSON document's fields into an existing [`Document`].
///
/// Decoded fields are inserted into `target`, replacing any value already
/// stored under the same name. On error, fields decoded before the failure
/// remain in `target`; decode into a fresh document and swap it in when the
/// update must be all-or-nothing.
pub fn decode_document_into(data: &[u8], target: &mut Document) -> Result<()> {
    decode_into(data, target, &DecoderConfig::default())
}

fn decode_into(data: &[u8], target: &mut Document, config: &DecoderConfig) -> Result<()> {
    let elements = document_elements(data)?;
    if data.len() > config.max_document_size {
        return Err(Error::MaxDocumentSizeExceeded);
    }
    decode_elements(elements, target, config, 1)
}

fn decode_elements(elements: &[u8], target: &mut Document, config: &DecoderConfig, depth: usize) -> Result<()> {
    for element in ElementCursor::new(elements) {
        let element = element?;
        let name = element.name_str()?;
        let value = decode_element_value(element.decode()?, config, depth)?;
        if target.contains_key(name) {
            match config.duplicate_key_mode {
                DuplicateKeyMode::Error => return Err(Error::DuplicateKey(name.to_string())),
                DuplicateKeyMode::KeepFirst => continue,
                DuplicateKeyMode::KeepLast => {}
            }
        }
        target.insert(name, value);
    }
    Ok(())
}

fn nested_depth(config: &DecoderConfig, depth: usize) -> Result<usize> {
    let depth = depth + 1;
    if depth > config.max_depth {
        return Err(Error::MaxDepthExceeded);
    }
    Ok(depth)
}

pub(crate) fn decode_nested(data: &[u8], config: &DecoderConfig, depth: usize) -> Result<Document> {
    let depth = nested_depth(config, depth)?;
    let mut document = Document::new();
    decode_elements(document_elements(data)?, &mut document, config, depth)?;
    Ok(document)
}

fn decode_element_value(decoded: DecodedValue<'_>, config: &DecoderConfig, depth: usize) -> Result<Value> {
    let value = match decoded {
        DecodedValue::Double(v) => Value::Double(v),
        DecodedValue::String(s) => Value::String(s.to_owned()),
        DecodedValue::Document(bytes) => Value::Document(decode_nested(bytes, config, depth)?),
        DecodedValue::Array(bytes) => {
            let depth = nested_depth(config, depth)?;
            let items = array_elements(bytes)?
                .into_iter()
                .map(|element| decode_element_value(element.decode()?, config, depth))
                .collect::<Result<Vec<_>>>()?;
            Value::Array(items)
        }
        DecodedValue::Binary { subtype, bytes } => Value::Binary(Binary {
            subtype,
            bytes: bytes.to_vec(),
        }),
        DecodedValue::Undefined => Value::Undefined,
        DecodedValue::ObjectId(id) => Value::ObjectId(id),
        DecodedValue::Boolean(v) => Value::Boolean(v),
        DecodedValue::DateTime(dt) => Value::DateTime(dt),
        DecodedValue::Null => Value::Null,
        DecodedValue::Regex { pattern, options } => Value::Regex(Regex::new(pattern, options)),
        DecodedValue::DbPointer { namespace, id } => Value::DbPointer(DbPointer {
            namespace: namespace.to_owned(),
            id,
        }),
        DecodedValue::JavaScriptCode(code) => Value::JavaScriptCode(code.to_owned()),
        DecodedValue::Symbol(symbol) => Value::Symbol(symbol.to_owned()),
        DecodedValue::JavaScriptCodeWithScope { code, scope } => {
            Value::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
                code: code.to_owned(),
                scope: decode_nested(scope, config, depth)?,
            })
        }
        DecodedValue::Int32(v) => Value::Int32(v),
        DecodedValue::Timestamp(ts) => Value::Timestamp(ts),
        DecodedValue::Int64(v) => Value::Int64(v),
        DecodedValue::Decimal128(d) => Value::Decimal128(d),
        DecodedValue::MinKey => Value::MinKey,
        DecodedValue::MaxKey => Value::MaxKey,
    };
    Ok(value)
}

/// Decode a pre-encoded element (`[tag] ++ payload`) into a [`Value`].
///
/// The bytes come either from this crate's deserializer, which has already
/// applied the caller's config to any embedded scope, or from a foreign
/// format, for which the default limits apply.
pub(crate) fn decode_raw_element(raw: &[u8]) -> Result<Value> {
    let (&tag, payload) = raw.split_first().ok_or(Error::Corrupt("raw element"))?;
    if payload_len(tag, payload)? != payload.len() {
        return Err(Error::Corrupt(element_type::name(tag)));
    }
    decode_element_value(decode_payload(tag, payload)?, &DecoderConfig::default(), 1)
}

/// Encode a [`Document`] to BSON bytes.
///
/// # Example
///
/// ```rust
/// use serde_bson::{doc, encode_document};
///
/// let bytes = encode_document(&doc! { "hello": "world" }).unwrap();
/// assert_eq!(bytes.len(), 22);
/// assert_eq!(bytes[0] as usize, bytes.len());
/// ```
pub fn encode_document(document: &Document) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    write_document(&mut encoder, document)?;
    Ok(encoder.into_inner())
}

/// Encode a [`Value`] to BSON bytes. The value must be a document.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Null => Err(Error::EncodeNil),
        Value::Document(document) => encode_document(document),
        other => Err(Error::InvalidSource(other.kind().to_string())),
    }
}

fn write_document(encoder: &mut Encoder, document: &Document) -> Result<()> {
    let start = encoder.begin_document();
    for (key, value) in document {
        write_element(encoder, key, value)?;
    }
    encoder.end_document(start)?;
    Ok(())
}

fn write_array(encoder: &mut Encoder, items: &[Value]) -> Result<()> {
    let start = encoder.begin_document();
    for (index, item) in items.iter().enumerate() {
        write_element(encoder, &index.to_string(), item)?;
    }
    encoder.end_document(start)?;
    Ok(())
}

fn write_element(encoder: &mut Encoder, key: &str, value: &Value) -> Result<()> {
    encoder.write_element_header(value.element_type(), key)?;
    match value {
        Value::Double(v) => encoder.write_f64(*v),
        Value::String(s) | Value::JavaScriptCode(s) | Value::Symbol(s) => encoder.write_string(s)?,
        Value::Document(document) => write_document(encoder, document)?,
        Value::Array(items) => write_array(encoder, items)?,
        Value::Binary(binary) => encoder.write_binary(binary.subtype, &binary.bytes)?,
        Value::Undefined | Value::Null | Value::MinKey | Value::MaxKey => {}
        Value::ObjectId(id) => encoder.write_object_id(id),
        Value::Boolean(v) => encoder.write_bool(*v),
        Value::DateTime(dt) => encoder.write_i64(dt.timestamp_millis()),
        Value::Regex(regex) => encoder.write_regex(&regex.pattern, &regex.options)?,
        Value::DbPointer(pointer) => {
            encoder.write_string(&pointer.namespace)?;
            encoder.write_object_id(&pointer.id);
        }
        Value::JavaScriptCodeWithScope(code) => write_code_with_scope(encoder, &code.code, &code.scope)?,
        Value::Int32(v) => encoder.write_i32(*v),
        Value::Timestamp(ts) => encoder.write_u64(ts.to_u64()),
        Value::Int64(v) => encoder.write_i64(*v),
        Value::Decimal128(d) => encoder.write_bytes(&d.bytes),
    }
    Ok(())
}

/// Write a code-with-scope payload: int32 total length, code string, scope document.
pub(crate) fn write_code_with_scope(encoder: &mut Encoder, code: &str, scope: &Document) -> Result<()> {
    let start = encoder.begin_document();
    encoder.write_string(code)?;
    write_document(encoder, scope)?;
    encoder.patch_length(start)?;
    Ok(())
}

// Implement Serialize for Value
impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use ser::serialize_raw_element;

        match self {
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Document(document) => document.serialize(serializer),
            Value::Array(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::Null => serializer.serialize_unit(),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Binary(v) => v.serialize(serializer),
            Value::ObjectId(v) => v.serialize(serializer),
            Value::DateTime(v) => v.serialize(serializer),
            Value::Regex(v) => v.serialize(serializer),
            Value::DbPointer(v) => v.serialize(serializer),
            Value::JavaScriptCodeWithScope(v) => v.serialize(serializer),
            Value::Timestamp(v) => v.serialize(serializer),
            Value::Decimal128(v) => v.serialize(serializer),
            Value::JavaScriptCode(code) => {
                serialize_raw_element(serializer, element_type::JAVASCRIPT, |enc| enc.write_string(code))
            }
            Value::Symbol(symbol) => {
                serialize_raw_element(serializer, element_type::SYMBOL, |enc| enc.write_string(symbol))
            }
            Value::Undefined => serialize_raw_element(serializer, element_type::UNDEFINED, |_| Ok(())),
            Value::MinKey => serialize_raw_element(serializer, element_type::MIN_KEY, |_| Ok(())),
            Value::MaxKey => serialize_raw_element(serializer, element_type::MAX_KEY, |_| Ok(())),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct DocumentVisitor;

impl<'de> serde::de::Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "a BSON document")
    }

    fn visit_map<A: serde::de::MapAccess<'de>>(self, mut map: A) -> std::result::Result<Document, A::Error> {
        let mut document = Document::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            document.insert(key, value);
        }
        Ok(document)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

// Implement Deserialize for Value
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> serde::de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "any valid BSON value")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
                Ok(Value::Boolean(v))
            }

            fn visit_i32<E>(self, v: i32) -> std::result::Result<Value, E> {
                Ok(Value::Int32(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
                Ok(Value::Int64(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<Value, E> {
                i64::try_from(v)
                    .map(Value::Int64)
                    .map_err(|_| E::custom(format!("u64 value {v} exceeds int64")))
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
                Ok(Value::Double(v))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
                Ok(Value::String(v.to_owned()))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
                Ok(Value::String(v))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Value, E> {
                Ok(Value::Binary(Binary {
                    subtype: binary_subtype::GENERIC,
                    bytes: v.to_vec(),
                }))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D: serde::Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Value, D::Error> {
                Deserialize::deserialize(deserializer)
            }

            fn visit_newtype_struct<D: serde::Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Value, D::Error> {
                deserializer.deserialize_byte_buf(de::RawValueVisitor)
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(self, map: A) -> std::result::Result<Value, A::Error> {
                serde::de::Visitor::visit_map(DocumentVisitor, map).map(Value::Document)
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod ser_tests;
#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod value_tests;
