// ABOUTME: Zero-copy BSON element cursor and payload decoding.
// ABOUTME: Walks a document's element list by index arithmetic, validating every length.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::error::{Error, Result};
use crate::types::{element_type, limits, DateTime, Decimal128, ObjectId, Timestamp};

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
pub(crate) fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
pub(crate) fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

/// How to handle repeated field names within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyMode {
    /// Raise an error on duplicate keys
    Error,
    /// Keep the first value, ignore subsequent duplicates
    KeepFirst,
    /// Keep the last value, overwrite earlier values (BSON permits duplicates)
    #[default]
    KeepLast,
}

/// Configuration options for decoding.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// How to handle duplicate keys (default: KeepLast)
    pub duplicate_key_mode: DuplicateKeyMode,
    /// Maximum document nesting depth
    pub max_depth: usize,
    /// Maximum document size in bytes
    pub max_document_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            duplicate_key_mode: DuplicateKeyMode::default(),
            max_depth: limits::MAX_DEPTH,
            max_document_size: limits::MAX_DOCUMENT_SIZE,
        }
    }
}

/// Read a little-endian i32 from the first four bytes. Caller guarantees length.
#[inline]
pub(crate) fn read_i32(buf: &[u8]) -> i32 {
    i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

#[inline]
fn read_u64(buf: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    u64::from_le_bytes(bytes)
}

/// Check a whole document's framing and return its element list, with the
/// 4-byte header and trailing `0x00` stripped.
pub fn document_elements(data: &[u8]) -> Result<&[u8]> {
    if data.len() < limits::MIN_DOCUMENT_SIZE {
        return Err(Error::TooShort);
    }
    let declared = read_i32(data);
    if i64::from(declared) != data.len() as i64 {
        return Err(Error::LengthMismatch {
            declared: i64::from(declared),
            actual: data.len(),
        });
    }
    if data[data.len() - 1] != 0 {
        return Err(Error::Corrupt("document terminator"));
    }
    Ok(&data[4..data.len() - 1])
}

/// One element of a document: its type tag, field name (without the
/// terminator), and the exact wire bytes of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub element_type: u8,
    pub name: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> Element<'a> {
    /// The field name as UTF-8.
    pub fn name_str(&self) -> Result<&'a str> {
        validate_utf8(self.name)
    }

    /// Decode the payload into a borrowed view.
    pub fn decode(&self) -> Result<DecodedValue<'a>> {
        decode_payload(self.element_type, self.payload)
    }
}

/// An iterator over the elements of one document.
///
/// Constructed over the element list only (see [`document_elements`]). It
/// owns no data; each call to [`advance`](Self::advance) slices the next
/// element off the remaining input.
#[derive(Debug)]
pub struct ElementCursor<'a> {
    rest: &'a [u8],
    current: Option<Element<'a>>,
    error: Option<Error>,
}

impl<'a> ElementCursor<'a> {
    #[must_use]
    pub fn new(elements: &'a [u8]) -> Self {
        Self {
            rest: elements,
            current: None,
            error: None,
        }
    }

    /// Move to the next element. Returns false when the list is exhausted or
    /// on the first error; the error is then available from [`error`](Self::error).
    pub fn advance(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        match self.split_element() {
            Ok(Some((element, rest))) => {
                self.current = Some(element);
                self.rest = rest;
                true
            }
            Ok(None) => false,
            Err(err) => {
                self.current = None;
                self.rest = &[];
                self.error = Some(err);
                false
            }
        }
    }

    /// The element produced by the last successful [`advance`](Self::advance).
    #[must_use]
    pub fn current(&self) -> Option<Element<'a>> {
        self.current
    }

    /// The first error encountered, or None if exhaustion was clean.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        self.rest
    }

    fn split_element(&self) -> Result<Option<(Element<'a>, &'a [u8])>> {
        let buf = self.rest;
        match buf.len() {
            0 => return Ok(None),
            // A valid element needs at least a tag and an empty cstring.
            1 => return Err(Error::CursorExhausted),
            _ => {}
        }
        let tag = buf[0];
        let name_len = memchr::memchr(0, &buf[1..]).ok_or(Error::MissingTerminator)?;
        let name = &buf[1..1 + name_len];
        let rest = &buf[2 + name_len..];
        let len = payload_len(tag, rest)?;
        let (payload, rest) = rest.split_at(len);
        Ok(Some((
            Element {
                element_type: tag,
                name,
                payload,
            },
            rest,
        )))
    }
}

impl<'a> Iterator for ElementCursor<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            return self.current.map(Ok);
        }
        // The remaining input was cleared on error, so later calls end cleanly.
        self.error.take().map(Err)
    }
}

/// Length of the payload for an element of type `tag` at the start of `rest`.
///
/// Validates only what is needed to find the payload's end; contents are
/// checked later by [`decode_payload`].
pub fn payload_len(tag: u8, rest: &[u8]) -> Result<usize> {
    let kind = element_type::name(tag);
    if let Some(size) = element_type::fixed_size(tag) {
        if rest.len() < size {
            return Err(Error::Corrupt(kind));
        }
        return Ok(size);
    }
    match tag {
        element_type::STRING | element_type::JAVASCRIPT | element_type::SYMBOL => string_len(rest, kind),
        element_type::DOCUMENT | element_type::ARRAY | element_type::JAVASCRIPT_WITH_SCOPE => {
            if rest.len() < 4 {
                return Err(Error::Corrupt(kind));
            }
            let declared = read_i32(rest);
            if declared < limits::MIN_DOCUMENT_SIZE as i32 {
                return Err(Error::Corrupt(kind));
            }
            let declared = declared as usize;
            if rest.len() < declared {
                return Err(Error::PayloadOverrun {
                    kind,
                    declared,
                    available: rest.len(),
                });
            }
            Ok(declared)
        }
        element_type::BINARY => {
            if rest.len() < 5 {
                return Err(Error::Corrupt(kind));
            }
            let declared = read_i32(rest);
            if declared < 0 {
                return Err(Error::Corrupt(kind));
            }
            let declared = declared as usize;
            if rest.len() - 5 < declared {
                return Err(Error::PayloadOverrun {
                    kind,
                    declared,
                    available: rest.len() - 5,
                });
            }
            Ok(5 + declared)
        }
        element_type::REGEX => {
            // Two cstrings: pattern then options.
            let first = memchr::memchr(0, rest).ok_or(Error::MissingTerminator)? + 1;
            let second = memchr::memchr(0, &rest[first..]).ok_or(Error::MissingTerminator)? + 1;
            Ok(first + second)
        }
        element_type::DB_POINTER => {
            let len = string_len(rest, kind)?;
            if rest.len() - len < 12 {
                return Err(Error::Corrupt(kind));
            }
            Ok(len + 12)
        }
        _ => Err(Error::UnknownElementType(tag)),
    }
}

/// Length of a string-layout payload: int32 byte count (including the
/// trailing nul), the bytes, and the nul.
fn string_len(rest: &[u8], kind: &'static str) -> Result<usize> {
    if rest.len() < 5 {
        return Err(Error::Corrupt(kind));
    }
    let declared = read_i32(rest);
    if declared < 1 {
        return Err(Error::Corrupt(kind));
    }
    let declared = declared as usize;
    if rest.len() - 4 < declared {
        return Err(Error::PayloadOverrun {
            kind,
            declared,
            available: rest.len() - 4,
        });
    }
    Ok(4 + declared)
}

/// A decoded element payload, borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedValue<'a> {
    Double(f64),
    String(&'a str),
    /// A complete embedded document, header and trailer included.
    Document(&'a [u8]),
    /// A complete embedded array document, header and trailer included.
    Array(&'a [u8]),
    Binary { subtype: u8, bytes: &'a [u8] },
    Undefined,
    ObjectId(ObjectId),
    Boolean(bool),
    DateTime(DateTime),
    Null,
    Regex { pattern: &'a str, options: &'a str },
    DbPointer { namespace: &'a str, id: ObjectId },
    JavaScriptCode(&'a str),
    Symbol(&'a str),
    JavaScriptCodeWithScope { code: &'a str, scope: &'a [u8] },
    Int32(i32),
    Timestamp(Timestamp),
    Int64(i64),
    Decimal128(Decimal128),
    MinKey,
    MaxKey,
}

/// Decode a payload whose span was produced by [`payload_len`].
pub fn decode_payload(tag: u8, payload: &[u8]) -> Result<DecodedValue<'_>> {
    let value = match tag {
        element_type::DOUBLE => DecodedValue::Double(f64::from_bits(read_u64(payload))),
        element_type::STRING => DecodedValue::String(read_string(payload, element_type::name(tag))?),
        element_type::DOCUMENT => DecodedValue::Document(payload),
        element_type::ARRAY => DecodedValue::Array(payload),
        element_type::BINARY => DecodedValue::Binary {
            subtype: payload[4],
            bytes: &payload[5..],
        },
        element_type::UNDEFINED => DecodedValue::Undefined,
        element_type::OBJECT_ID => DecodedValue::ObjectId(read_object_id(payload)),
        element_type::BOOLEAN => match payload[0] {
            0 => DecodedValue::Boolean(false),
            1 => DecodedValue::Boolean(true),
            other => return Err(Error::InvalidBoolean(other)),
        },
        element_type::DATETIME => DecodedValue::DateTime(DateTime::from_millis(read_u64(payload) as i64)),
        element_type::NULL => DecodedValue::Null,
        element_type::REGEX => {
            let end = memchr::memchr(0, payload).ok_or(Error::MissingTerminator)?;
            let pattern = validate_utf8(&payload[..end])?;
            let options = validate_utf8(&payload[end + 1..payload.len() - 1])?;
            DecodedValue::Regex { pattern, options }
        }
        element_type::DB_POINTER => {
            let split = payload.len() - 12;
            DecodedValue::DbPointer {
                namespace: read_string(&payload[..split], element_type::name(tag))?,
                id: read_object_id(&payload[split..]),
            }
        }
        element_type::JAVASCRIPT => DecodedValue::JavaScriptCode(read_string(payload, element_type::name(tag))?),
        element_type::SYMBOL => DecodedValue::Symbol(read_string(payload, element_type::name(tag))?),
        element_type::JAVASCRIPT_WITH_SCOPE => {
            let kind = element_type::name(tag);
            let body = &payload[4..];
            let code_len = string_len(body, kind)?;
            let code = read_string(&body[..code_len], kind)?;
            let scope = &body[code_len..];
            if scope.len() < limits::MIN_DOCUMENT_SIZE || read_i32(scope) as i64 != scope.len() as i64 {
                return Err(Error::Corrupt(kind));
            }
            DecodedValue::JavaScriptCodeWithScope { code, scope }
        }
        element_type::INT32 => DecodedValue::Int32(read_i32(payload)),
        element_type::TIMESTAMP => DecodedValue::Timestamp(Timestamp::from_u64(read_u64(payload))),
        element_type::INT64 => DecodedValue::Int64(read_u64(payload) as i64),
        element_type::DECIMAL128 => {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(&payload[..16]);
            DecodedValue::Decimal128(Decimal128 { bytes })
        }
        element_type::MIN_KEY => DecodedValue::MinKey,
        element_type::MAX_KEY => DecodedValue::MaxKey,
        _ => return Err(Error::UnknownElementType(tag)),
    };
    Ok(value)
}

/// Read a string-layout payload (length prefix, bytes, nul) as UTF-8.
fn read_string<'a>(payload: &'a [u8], kind: &'static str) -> Result<&'a str> {
    match payload.split_last() {
        Some((0, body)) if body.len() >= 4 => validate_utf8(&body[4..]),
        Some(_) => Err(Error::Corrupt(kind)),
        None => Err(Error::Corrupt(kind)),
    }
}

#[inline]
fn read_object_id(payload: &[u8]) -> ObjectId {
    let mut bytes = [0u8; 12];
    bytes.copy_from_slice(&payload[..12]);
    ObjectId::from_bytes(bytes)
}

/// Elements of an embedded array document, projected into index order.
///
/// Keys must be the decimal indices `0..n`, each exactly once, in any order.
pub fn array_elements(data: &[u8]) -> Result<Vec<Element<'_>>> {
    let mut indexed = Vec::new();
    let mut in_order = true;
    for element in ElementCursor::new(document_elements(data)?) {
        let element = element?;
        let index = parse_index(element.name)
            .ok_or_else(|| Error::CorruptArray(String::from_utf8_lossy(element.name).into_owned()))?;
        in_order &= index == indexed.len();
        indexed.push((index, element));
    }
    if !in_order {
        indexed.sort_by_key(|(index, _)| *index);
        for (expected, (index, element)) in indexed.iter().enumerate() {
            if *index != expected {
                return Err(Error::CorruptArray(String::from_utf8_lossy(element.name).into_owned()));
            }
        }
    }
    Ok(indexed.into_iter().map(|(_, element)| element).collect())
}

/// Parse a canonical decimal array index ("0", "1", ... with no leading zeros).
fn parse_index(name: &[u8]) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name[0] == b'0') {
        return None;
    }
    let mut index: usize = 0;
    for &b in name {
        if !b.is_ascii_digit() {
            return None;
        }
        index = index.checked_mul(10)?.checked_add(usize::from(b - b'0'))?;
    }
    Some(index)
}
