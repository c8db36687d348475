// ABOUTME: Dynamic BSON value type and the insertion-ordered Document map.
// ABOUTME: Covers the closed set of BSON element kinds, plus the bson! and doc! macros.

use crate::types::{
    element_type, Binary, DateTime, DbPointer, Decimal128, JavaScriptCodeWithScope, ObjectId, Regex,
    Timestamp,
};
use indexmap::IndexMap;
use std::fmt;

/// A BSON value that can hold any element kind.
#[derive(Clone, PartialEq, Default)]
pub enum Value {
    /// 64-bit IEEE 754 floating point
    Double(f64),
    /// A UTF-8 string
    String(String),
    /// An embedded document
    Document(Document),
    /// An array (wire form: a document keyed "0", "1", ...)
    Array(Vec<Value>),
    Binary(Binary),
    /// Deprecated undefined marker
    Undefined,
    ObjectId(ObjectId),
    Boolean(bool),
    DateTime(DateTime),
    /// BSON null
    #[default]
    Null,
    Regex(Regex),
    DbPointer(DbPointer),
    JavaScriptCode(String),
    Symbol(String),
    JavaScriptCodeWithScope(JavaScriptCodeWithScope),
    Int32(i32),
    Timestamp(Timestamp),
    Int64(i64),
    Decimal128(Decimal128),
    MinKey,
    MaxKey,
}

impl Value {
    /// The wire type tag for this value.
    #[must_use]
    pub fn element_type(&self) -> u8 {
        match self {
            Value::Double(_) => element_type::DOUBLE,
            Value::String(_) => element_type::STRING,
            Value::Document(_) => element_type::DOCUMENT,
            Value::Array(_) => element_type::ARRAY,
            Value::Binary(_) => element_type::BINARY,
            Value::Undefined => element_type::UNDEFINED,
            Value::ObjectId(_) => element_type::OBJECT_ID,
            Value::Boolean(_) => element_type::BOOLEAN,
            Value::DateTime(_) => element_type::DATETIME,
            Value::Null => element_type::NULL,
            Value::Regex(_) => element_type::REGEX,
            Value::DbPointer(_) => element_type::DB_POINTER,
            Value::JavaScriptCode(_) => element_type::JAVASCRIPT,
            Value::Symbol(_) => element_type::SYMBOL,
            Value::JavaScriptCodeWithScope(_) => element_type::JAVASCRIPT_WITH_SCOPE,
            Value::Int32(_) => element_type::INT32,
            Value::Timestamp(_) => element_type::TIMESTAMP,
            Value::Int64(_) => element_type::INT64,
            Value::Decimal128(_) => element_type::DECIMAL128,
            Value::MinKey => element_type::MIN_KEY,
            Value::MaxKey => element_type::MAX_KEY,
        }
    }

    /// Name of this value's kind, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        element_type::name(self.element_type())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns true for the three numeric kinds.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Double(_) | Value::Int32(_) | Value::Int64(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns int32 and int64 values widened to i64.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Value::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Index into an array. Returns None if not an array or index out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// Look up a field of an embedded document.
    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.as_document().and_then(|d| d.get(key))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(n) => write!(f, "Double({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Document(d) => f.debug_tuple("Document").field(d).finish(),
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Binary(b) => write!(f, "{b:?}"),
            Value::Undefined => write!(f, "Undefined"),
            Value::ObjectId(id) => write!(f, "{id:?}"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::DateTime(dt) => write!(f, "{dt:?}"),
            Value::Null => write!(f, "Null"),
            Value::Regex(r) => write!(f, "{r:?}"),
            Value::DbPointer(p) => write!(f, "{p:?}"),
            Value::JavaScriptCode(c) => write!(f, "JavaScriptCode({c:?})"),
            Value::Symbol(s) => write!(f, "Symbol({s:?})"),
            Value::JavaScriptCodeWithScope(c) => write!(f, "{c:?}"),
            Value::Int32(n) => write!(f, "Int32({n})"),
            Value::Timestamp(ts) => write!(f, "{ts:?}"),
            Value::Int64(n) => write!(f, "Int64({n})"),
            Value::Decimal128(d) => write!(f, "{d:?}"),
            Value::MinKey => write!(f, "MinKey"),
            Value::MaxKey => write!(f, "MaxKey"),
        }
    }
}

// Extended-JSON-flavoured display, for humans rather than parsers.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "\"{}\"", s.escape_default()),
            Value::Document(d) => write!(f, "{d}"),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Binary(b) => write!(f, "Binary({:#04x}, {} bytes)", b.subtype, b.bytes.len()),
            Value::Undefined => write!(f, "undefined"),
            Value::ObjectId(id) => write!(f, "ObjectId(\"{id}\")"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::DateTime(dt) => write!(f, "Date({})", dt.timestamp_millis()),
            Value::Null => write!(f, "null"),
            Value::Regex(r) => write!(f, "/{}/{}", r.pattern, r.options),
            Value::DbPointer(p) => write!(f, "DBPointer(\"{}\", {})", p.namespace, p.id),
            Value::JavaScriptCode(c) => write!(f, "Code({c:?})"),
            Value::Symbol(s) => write!(f, "Symbol({s:?})"),
            Value::JavaScriptCodeWithScope(c) => write!(f, "Code({:?}, {})", c.code, c.scope),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Timestamp(ts) => write!(f, "Timestamp({}, {})", ts.time, ts.increment),
            Value::Int64(n) => write!(f, "NumberLong({n})"),
            Value::Decimal128(_) => write!(f, "NumberDecimal(..)"),
            Value::MinKey => write!(f, "MinKey"),
            Value::MaxKey => write!(f, "MaxKey"),
        }
    }
}

/// A BSON document: string keys mapped to values, in insertion order.
///
/// Equality ignores key order. Inserting an existing key replaces its value
/// in place, which gives decode its last-write-wins behaviour for repeated
/// field names.
#[derive(Clone, PartialEq, Default)]
pub struct Document {
    inner: IndexMap<String, Value>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert a field, returning the previous value for that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.inner.get_mut(key)
    }

    /// Remove a field, preserving the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.inner.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.inner.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.inner.values()
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Value::as_i32)
    }

    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    #[must_use]
    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Value::as_document)
    }

    #[must_use]
    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.iter()).finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.inner.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\": {}", k.escape_default(), v)?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Document {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i8> for Value {
    fn from(n: i8) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<i16> for Value {
    fn from(n: i16) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int64(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Double(f64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::ObjectId(id)
    }
}

impl From<DateTime> for Value {
    fn from(dt: DateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Regex> for Value {
    fn from(r: Regex) -> Self {
        Value::Regex(r)
    }
}

impl From<Binary> for Value {
    fn from(b: Binary) -> Self {
        Value::Binary(b)
    }
}

impl From<Decimal128> for Value {
    fn from(d: Decimal128) -> Self {
        Value::Decimal128(d)
    }
}

impl From<DbPointer> for Value {
    fn from(p: DbPointer) -> Self {
        Value::DbPointer(p)
    }
}

impl From<JavaScriptCodeWithScope> for Value {
    fn from(c: JavaScriptCodeWithScope) -> Self {
        Value::JavaScriptCodeWithScope(c)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::Array(iter.into_iter().map(Into::into).collect())
    }
}

/// Macro for creating BSON values easily.
///
/// Integer literals become `Int32`; use a suffix (`5i64`) for `Int64`.
///
/// # Examples
///
/// ```rust
/// use serde_bson::bson;
///
/// let value = bson!({
///     "name": "test",
///     "values": [1, 2, 3],
///     "active": true
/// });
/// assert!(value.is_document());
/// ```
#[macro_export]
macro_rules! bson {
    // null
    (null) => {
        $crate::Value::Null
    };

    // bool
    (true) => {
        $crate::Value::Boolean(true)
    };
    (false) => {
        $crate::Value::Boolean(false)
    };

    // array
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![ $( $crate::bson!($elem) ),* ])
    };

    // document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::Value::Document($crate::doc!{ $($key : $value),* })
    };

    // other expressions (numbers, strings, etc.)
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

/// Macro for creating a [`Document`] with fields in the order written.
///
/// ```rust
/// use serde_bson::doc;
///
/// let d = doc! { "hello": "world", "n": 1 };
/// assert_eq!(d.get_str("hello"), Some("world"));
/// assert_eq!(d.keys().collect::<Vec<_>>(), ["hello", "n"]);
/// ```
#[macro_export]
macro_rules! doc {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!{ $($key : $value),* }
    };
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut document = $crate::Document::new();
            $(
                document.insert(String::from($key), $crate::bson!($value));
            )*
            document
        }
    };
}
