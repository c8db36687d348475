// ABOUTME: Defines BSON element type tags and the special BSON value types.
// ABOUTME: Type tags map directly to the BSON specification byte values.

use crate::de::deserialize_raw_value;
use crate::error::Error;
use crate::ser::serialize_raw_element;
use crate::value::{Document, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Element type tags for BSON values.
/// These match the BSON specification exactly.
pub mod element_type {
    pub const DOUBLE: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const DOCUMENT: u8 = 0x03;
    pub const ARRAY: u8 = 0x04;
    pub const BINARY: u8 = 0x05;
    // Deprecated
    pub const UNDEFINED: u8 = 0x06;
    pub const OBJECT_ID: u8 = 0x07;
    pub const BOOLEAN: u8 = 0x08;
    pub const DATETIME: u8 = 0x09;
    pub const NULL: u8 = 0x0a;
    pub const REGEX: u8 = 0x0b;
    // Deprecated
    pub const DB_POINTER: u8 = 0x0c;
    pub const JAVASCRIPT: u8 = 0x0d;
    // Deprecated
    pub const SYMBOL: u8 = 0x0e;
    // Deprecated
    pub const JAVASCRIPT_WITH_SCOPE: u8 = 0x0f;
    pub const INT32: u8 = 0x10;
    pub const TIMESTAMP: u8 = 0x11;
    pub const INT64: u8 = 0x12;
    pub const DECIMAL128: u8 = 0x13;
    pub const MAX_KEY: u8 = 0x7f;
    pub const MIN_KEY: u8 = 0xff;

    /// Human-readable name of a type tag, used in diagnostics.
    #[must_use]
    pub const fn name(tag: u8) -> &'static str {
        match tag {
            DOUBLE => "double",
            STRING => "utf8 string",
            DOCUMENT => "document",
            ARRAY => "array",
            BINARY => "binary",
            UNDEFINED => "undefined",
            OBJECT_ID => "object id",
            BOOLEAN => "boolean",
            DATETIME => "utc datetime",
            NULL => "null",
            REGEX => "regex",
            DB_POINTER => "db pointer",
            JAVASCRIPT => "javascript",
            SYMBOL => "symbol",
            JAVASCRIPT_WITH_SCOPE => "javascript with scope",
            INT32 => "int32",
            TIMESTAMP => "timestamp",
            INT64 => "int64",
            DECIMAL128 => "decimal128",
            MAX_KEY => "max key",
            MIN_KEY => "min key",
            _ => "unknown",
        }
    }

    /// Payload size for tags whose payload has a fixed width.
    #[inline]
    #[must_use]
    pub const fn fixed_size(tag: u8) -> Option<usize> {
        match tag {
            DOUBLE | DATETIME | TIMESTAMP | INT64 => Some(8),
            OBJECT_ID => Some(12),
            BOOLEAN => Some(1),
            INT32 => Some(4),
            DECIMAL128 => Some(16),
            UNDEFINED | NULL | MAX_KEY | MIN_KEY => Some(0),
            _ => None,
        }
    }
}

/// Binary subtypes defined by the BSON specification.
pub mod binary_subtype {
    pub const GENERIC: u8 = 0x00;
    pub const FUNCTION: u8 = 0x01;
    pub const BINARY_OLD: u8 = 0x02;
    pub const UUID_OLD: u8 = 0x03;
    pub const UUID: u8 = 0x04;
    pub const MD5: u8 = 0x05;
    pub const USER_DEFINED: u8 = 0x80;
}

/// Size limits for BSON documents.
pub mod limits {
    /// Smallest valid document: 4-byte length plus trailing `0x00`.
    pub const MIN_DOCUMENT_SIZE: usize = 5;

    /// The length header is a signed 32-bit integer.
    pub const MAX_DOCUMENT_SIZE: usize = i32::MAX as usize;

    /// Maximum document nesting depth, the limit MongoDB enforces
    pub const MAX_DEPTH: usize = 100;
}

/// A 12-byte BSON ObjectId.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Creation time in seconds since the epoch, stored big-endian in the
    /// first four bytes.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Lowercase 24-character hex representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use std::fmt::Write as _;
        let mut s = String::with_capacity(24);
        for b in self.0 {
            let _ = write!(s, "{b:02x}");
        }
        s
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.as_bytes();
        if hex.len() != 24 {
            return Err(Error::Custom(format!("object id must be 24 hex digits, got {}", hex.len())));
        }
        let mut bytes = [0u8; 12];
        for (i, pair) in hex.chunks_exact(2).enumerate() {
            // from_str_radix alone would let a sign through
            if !pair.iter().all(u8::is_ascii_hexdigit) {
                return Err(Error::Custom(format!("invalid hex in object id: {s:?}")));
            }
            let text = std::str::from_utf8(pair)?;
            bytes[i] = u8::from_str_radix(text, 16)
                .map_err(|_| Error::Custom(format!("invalid hex in object id: {s:?}")))?;
        }
        Ok(Self(bytes))
    }
}

/// A UTC datetime in milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DateTime(i64);

impl DateTime {
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn timestamp_millis(&self) -> i64 {
        self.0
    }
}

impl From<std::time::SystemTime> for DateTime {
    #[allow(clippy::cast_possible_truncation)]
    fn from(t: std::time::SystemTime) -> Self {
        match t.duration_since(std::time::UNIX_EPOCH) {
            Ok(d) => Self(d.as_millis() as i64),
            Err(e) => Self(-(e.duration().as_millis() as i64)),
        }
    }
}

/// A BSON replication timestamp.
///
/// On the wire this is a little-endian u64 whose low 32 bits hold the
/// increment and whose high 32 bits hold the seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

impl Timestamp {
    #[inline]
    #[must_use]
    pub const fn from_u64(packed: u64) -> Self {
        Self {
            time: (packed >> 32) as u32,
            increment: packed as u32,
        }
    }

    #[inline]
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        ((self.time as u64) << 32) | self.increment as u64
    }
}

/// A regular expression: pattern and option flags, both cstrings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Regex {
    pub pattern: String,
    pub options: String,
}

impl Regex {
    pub fn new(pattern: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            options: options.into(),
        }
    }
}

/// Binary data with its subtype.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

/// An IEEE 754-2008 decimal128, kept as its 16 raw little-endian bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Decimal128 {
    pub bytes: [u8; 16],
}

/// Deprecated DBPointer: a namespace plus an ObjectId.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DbPointer {
    pub namespace: String,
    pub id: ObjectId,
}

/// Deprecated JavaScript code with an attached scope document.
#[derive(Clone, Debug, PartialEq)]
pub struct JavaScriptCodeWithScope {
    pub code: String,
    pub scope: Document,
}

// The special types travel through serde as raw elements so that they
// survive a round trip through this crate's Serializer and Deserializer.

macro_rules! raw_element_serde {
    ($ty:ty, $tag:expr, $expected:literal, |$this:ident, $enc:ident| $write:expr, $variant:pat => $out:expr) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                let $this = self;
                serialize_raw_element(serializer, $tag, |$enc| $write)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                match deserialize_raw_value(deserializer)? {
                    $variant => Ok($out),
                    other => Err(serde::de::Error::custom(format!(
                        concat!("expected ", $expected, ", found {}"),
                        other.kind()
                    ))),
                }
            }
        }
    };
}

raw_element_serde!(ObjectId, element_type::OBJECT_ID, "object id",
    |this, enc| { enc.write_object_id(this); Ok(()) },
    Value::ObjectId(v) => v);
raw_element_serde!(DateTime, element_type::DATETIME, "utc datetime",
    |this, enc| { enc.write_i64(this.0); Ok(()) },
    Value::DateTime(v) => v);
raw_element_serde!(Timestamp, element_type::TIMESTAMP, "timestamp",
    |this, enc| { enc.write_u64(this.to_u64()); Ok(()) },
    Value::Timestamp(v) => v);
raw_element_serde!(Regex, element_type::REGEX, "regex",
    |this, enc| enc.write_regex(&this.pattern, &this.options),
    Value::Regex(v) => v);
raw_element_serde!(Binary, element_type::BINARY, "binary",
    |this, enc| enc.write_binary(this.subtype, &this.bytes),
    Value::Binary(v) => v);
raw_element_serde!(Decimal128, element_type::DECIMAL128, "decimal128",
    |this, enc| { enc.write_bytes(&this.bytes); Ok(()) },
    Value::Decimal128(v) => v);
raw_element_serde!(DbPointer, element_type::DB_POINTER, "db pointer",
    |this, enc| { enc.write_string(&this.namespace)?; enc.write_object_id(&this.id); Ok(()) },
    Value::DbPointer(v) => v);
raw_element_serde!(JavaScriptCodeWithScope, element_type::JAVASCRIPT_WITH_SCOPE, "javascript with scope",
    |this, enc| crate::write_code_with_scope(enc, &this.code, &this.scope),
    Value::JavaScriptCodeWithScope(v) => v);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(element_type::fixed_size(element_type::DOUBLE), Some(8));
        assert_eq!(element_type::fixed_size(element_type::OBJECT_ID), Some(12));
        assert_eq!(element_type::fixed_size(element_type::NULL), Some(0));
        assert_eq!(element_type::fixed_size(element_type::STRING), None);
        assert_eq!(element_type::fixed_size(element_type::DOCUMENT), None);
    }

    #[test]
    fn test_timestamp_packing() {
        let ts = Timestamp { time: 0x0102_0304, increment: 0x0a0b_0c0d };
        assert_eq!(ts.to_u64(), 0x0102_0304_0a0b_0c0d);
        assert_eq!(Timestamp::from_u64(ts.to_u64()), ts);
    }
}
