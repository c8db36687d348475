// ABOUTME: Serde Deserializer implementation for BSON decoding.
// ABOUTME: Decodes BSON documents into any serde-deserializable map or struct, borrowing where it can.

use crate::decoder::{
    array_elements, document_elements, DecodedValue, DecoderConfig, DuplicateKeyMode, Element, ElementCursor,
};
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::ser::RAW_ELEMENT_NAME;
use crate::types::element_type;
use crate::value::Value;
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::{forward_to_deserialize_any, Deserialize};
use std::collections::{HashMap, HashSet};

/// A serde Deserializer over one whole BSON document.
///
/// The document's framing is checked on construction, so a `Deserializer`
/// always holds a well-formed element list.
pub struct Deserializer<'de> {
    elements: &'de [u8],
    config: DecoderConfig,
}

impl<'de> Deserializer<'de> {
    /// Create a new Deserializer from a byte slice.
    pub fn from_slice(data: &'de [u8]) -> Result<Self> {
        Self::from_slice_with_config(data, DecoderConfig::default())
    }

    /// Create a new Deserializer with custom configuration.
    pub fn from_slice_with_config(data: &'de [u8], config: DecoderConfig) -> Result<Self> {
        let elements = document_elements(data)?;
        if data.len() > config.max_document_size {
            return Err(Error::MaxDocumentSizeExceeded);
        }
        Ok(Self { elements, config })
    }

    fn document(&self) -> DocumentAccess<'_, 'de> {
        DocumentAccess::new(self.elements, &self.config, 1)
    }
}

/// Deserialize a value from a BSON byte slice.
///
/// A field name repeated within one document resolves to its last value,
/// for structs as well as maps. Use [`from_slice_with_config`] with
/// [`DuplicateKeyMode`] to keep the first value or reject repeats instead.
///
/// # Errors
///
/// Returns an error if:
/// - The input is shorter than 5 bytes or its length header disagrees with its size
/// - An element is malformed or truncated
/// - `T` is not a map, struct, or other document-shaped destination
/// - The data doesn't match the expected type `T`
pub fn from_slice<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T> {
    let mut de = Deserializer::from_slice(data)?;
    T::deserialize(&mut de)
}

/// Deserialize a value from a BSON byte slice with custom configuration.
///
/// # Errors
///
/// As [`from_slice`], plus the configured depth and size limits, and
/// `DuplicateKeyMode::Error` on a repeated field name.
pub fn from_slice_with_config<'de, T: Deserialize<'de>>(data: &'de [u8], config: DecoderConfig) -> Result<T> {
    let mut de = Deserializer::from_slice_with_config(data, config)?;
    T::deserialize(&mut de)
}

fn invalid_destination<T>(kind: &str) -> Result<T> {
    Err(Error::InvalidDestination(kind.to_string()))
}

macro_rules! reject_destination {
    ($($method:ident => $kind:literal),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
                invalid_destination($kind)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_map(self.document())
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_map(self.document())
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_map(self.document())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, name: &'static str, visitor: V) -> Result<V::Value> {
        if name == RAW_ELEMENT_NAME {
            return invalid_destination("bson scalar");
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(SingleKeyEnum {
            elements: self.elements,
            config: &self.config,
            depth: 1,
        })
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(self, _name: &'static str, _visitor: V) -> Result<V::Value> {
        invalid_destination("unit struct")
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value> {
        invalid_destination("tuple")
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value> {
        invalid_destination("tuple struct")
    }

    reject_destination! {
        deserialize_bool => "bool",
        deserialize_i8 => "i8",
        deserialize_i16 => "i16",
        deserialize_i32 => "i32",
        deserialize_i64 => "i64",
        deserialize_u8 => "u8",
        deserialize_u16 => "u16",
        deserialize_u32 => "u32",
        deserialize_u64 => "u64",
        deserialize_f32 => "f32",
        deserialize_f64 => "f64",
        deserialize_char => "char",
        deserialize_str => "str",
        deserialize_string => "string",
        deserialize_bytes => "bytes",
        deserialize_byte_buf => "byte buffer",
        deserialize_unit => "unit",
        deserialize_seq => "sequence",
        deserialize_identifier => "identifier",
    }
}

/// Yields the fields of one document as map entries.
struct DocumentAccess<'a, 'de> {
    cursor: ElementCursor<'de>,
    config: &'a DecoderConfig,
    depth: usize,
    pending: Option<Element<'de>>,
    position: usize,
    /// Names already yielded, for `KeepFirst` and `Error`.
    seen: HashSet<&'de [u8]>,
    /// Position of the final occurrence of each repeated name, for `KeepLast`.
    last_positions: HashMap<&'de [u8], usize>,
}

impl<'a, 'de> DocumentAccess<'a, 'de> {
    fn new(elements: &'de [u8], config: &'a DecoderConfig, depth: usize) -> Self {
        let last_positions = match config.duplicate_key_mode {
            DuplicateKeyMode::KeepLast => repeated_names(elements),
            DuplicateKeyMode::KeepFirst | DuplicateKeyMode::Error => HashMap::new(),
        };
        Self {
            cursor: ElementCursor::new(elements),
            config,
            depth,
            pending: None,
            position: 0,
            seen: HashSet::new(),
            last_positions,
        }
    }
}

/// Maps each repeated field name to the position of its last occurrence.
/// Empty when every name is distinct. Scanning stops at the first malformed
/// element, which the main cursor reports when it gets there.
fn repeated_names(elements: &[u8]) -> HashMap<&[u8], usize> {
    let mut last = HashMap::new();
    let mut repeated = false;
    for (position, element) in ElementCursor::new(elements).enumerate() {
        let Ok(element) = element else { break };
        repeated |= last.insert(element.name, position).is_some();
    }
    if !repeated {
        last.clear();
    }
    last
}

impl<'de> MapAccess<'de> for DocumentAccess<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        loop {
            let element = match self.cursor.next() {
                None => return Ok(None),
                Some(element) => element?,
            };
            let position = self.position;
            self.position += 1;
            let name = element.name_str()?;
            match self.config.duplicate_key_mode {
                // Only the last occurrence reaches the visitor, so records
                // see last-write-wins just like maps.
                DuplicateKeyMode::KeepLast => {
                    if self.last_positions.get(element.name).is_some_and(|&last| last != position) {
                        continue;
                    }
                }
                DuplicateKeyMode::KeepFirst => {
                    if !self.seen.insert(element.name) {
                        continue;
                    }
                }
                DuplicateKeyMode::Error => {
                    if !self.seen.insert(element.name) {
                        return Err(Error::DuplicateKey(name.to_string()));
                    }
                }
            }
            self.pending = Some(element);
            return seed.deserialize(BorrowedStrDeserializer::new(name)).map(Some);
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let element = self
            .pending
            .take()
            .ok_or_else(|| Error::Custom("value requested before key".into()))?;
        seed.deserialize(ElementDeserializer::new(element, self.config, self.depth))
    }
}

/// Yields array items in index order.
struct ArrayAccess<'a, 'de> {
    items: std::vec::IntoIter<Element<'de>>,
    config: &'a DecoderConfig,
    depth: usize,
}

impl<'de> SeqAccess<'de> for ArrayAccess<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.items.next() {
            Some(element) => seed
                .deserialize(ElementDeserializer::new(element, self.config, self.depth))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Deserializes the value of a single element.
struct ElementDeserializer<'a, 'de> {
    element: Element<'de>,
    config: &'a DecoderConfig,
    depth: usize,
}

impl<'a, 'de> ElementDeserializer<'a, 'de> {
    fn new(element: Element<'de>, config: &'a DecoderConfig, depth: usize) -> Self {
        Self { element, config, depth }
    }

    /// Depth of a document nested in this element.
    fn nested_depth(&self) -> Result<usize> {
        let depth = self.depth + 1;
        if depth > self.config.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        Ok(depth)
    }

    /// The element as `[tag] ++ payload`. A code-with-scope scope is decoded
    /// here under this decoder's config and depth, then written back in
    /// canonical form.
    fn raw(&self) -> Result<RawElementDeserializer> {
        let tag = self.element.element_type;
        let mut raw = Vec::with_capacity(1 + self.element.payload.len());
        raw.push(tag);
        match self.element.decode()? {
            DecodedValue::JavaScriptCodeWithScope { code, scope } => {
                let scope = crate::decode_nested(scope, self.config, self.depth)?;
                let mut encoder = Encoder::with_capacity(self.element.payload.len());
                crate::write_code_with_scope(&mut encoder, code, &scope)?;
                raw.extend_from_slice(encoder.as_bytes());
            }
            _ => raw.extend_from_slice(self.element.payload),
        }
        Ok(RawElementDeserializer { raw })
    }
}

impl<'de> de::Deserializer<'de> for ElementDeserializer<'_, 'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.element.decode()? {
            DecodedValue::Double(v) => visitor.visit_f64(v),
            DecodedValue::String(s) => visitor.visit_borrowed_str(s),
            DecodedValue::Document(bytes) => {
                let depth = self.nested_depth()?;
                visitor.visit_map(DocumentAccess::new(document_elements(bytes)?, self.config, depth))
            }
            DecodedValue::Array(bytes) => {
                let depth = self.nested_depth()?;
                visitor.visit_seq(ArrayAccess {
                    items: array_elements(bytes)?.into_iter(),
                    config: self.config,
                    depth,
                })
            }
            DecodedValue::Boolean(v) => visitor.visit_bool(v),
            DecodedValue::Null => visitor.visit_unit(),
            DecodedValue::Int32(v) => visitor.visit_i32(v),
            DecodedValue::Int64(v) => visitor.visit_i64(v),
            _ => visitor.visit_newtype_struct(self.raw()?),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.element.element_type {
            element_type::NULL | element_type::UNDEFINED => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, name: &'static str, visitor: V) -> Result<V::Value> {
        if name == RAW_ELEMENT_NAME {
            return visitor.visit_newtype_struct(self.raw()?);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.element.decode()? {
            DecodedValue::Binary { bytes, .. } => visitor.visit_borrowed_bytes(bytes),
            _ => de::Deserializer::deserialize_any(self, visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_bytes(self, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.element.decode()? {
            DecodedValue::String(s) => visitor.visit_enum(BorrowedStrDeserializer::new(s)),
            DecodedValue::Document(bytes) => visitor.visit_enum(SingleKeyEnum {
                elements: document_elements(bytes)?,
                config: self.config,
                depth: self.nested_depth()?,
            }),
            _ => Err(Error::Custom(format!(
                "expected string or document for enum, found {}",
                element_type::name(self.element.element_type)
            ))),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq tuple tuple_struct map struct identifier
    }
}

impl<'de> de::VariantAccess<'de> for ElementDeserializer<'_, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_map(self, visitor)
    }
}

/// An enum encoded as a document with exactly one field: the variant name
/// mapped to its content.
struct SingleKeyEnum<'a, 'de> {
    elements: &'de [u8],
    config: &'a DecoderConfig,
    depth: usize,
}

impl<'a, 'de> de::EnumAccess<'de> for SingleKeyEnum<'a, 'de> {
    type Error = Error;
    type Variant = ElementDeserializer<'a, 'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let mut cursor = ElementCursor::new(self.elements);
        let element = match cursor.next() {
            Some(element) => element?,
            None => return Err(Error::Custom("expected a single-key document for enum, found none".into())),
        };
        if cursor.next().is_some() {
            return Err(Error::Custom("expected a single-key document for enum".into()));
        }
        let variant = seed.deserialize(BorrowedStrDeserializer::<Error>::new(element.name_str()?))?;
        Ok((variant, ElementDeserializer::new(element, self.config, self.depth)))
    }
}

/// Presents one element as its pre-encoded bytes, `[tag] ++ payload`.
struct RawElementDeserializer {
    raw: Vec<u8>,
}

impl<'de> de::Deserializer<'de> for RawElementDeserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_byte_buf(self.raw)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

/// Rebuilds a [`Value`] from pre-encoded element bytes.
///
/// Accepts a byte sequence as well as bytes, so the special types also
/// come back through self-describing formats that write bytes as arrays.
pub(crate) struct RawValueVisitor;

impl<'de> Visitor<'de> for RawValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "a pre-encoded BSON element")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Value, E> {
        crate::decode_raw_element(v).map_err(E::custom)
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
        self.visit_bytes(&v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut raw = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            raw.push(byte);
        }
        self.visit_bytes(&raw)
    }

    fn visit_newtype_struct<D: de::Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Value, D::Error> {
        deserializer.deserialize_byte_buf(self)
    }
}

/// Deserialize one of the special BSON types via the raw element marker.
pub(crate) fn deserialize_raw_value<'de, D: de::Deserializer<'de>>(deserializer: D) -> std::result::Result<Value, D::Error> {
    deserializer.deserialize_newtype_struct(RAW_ELEMENT_NAME, RawValueVisitor)
}
