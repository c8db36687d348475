// ABOUTME: BSON byte-level encoder over a growable buffer.
// ABOUTME: Documents reserve a 4-byte length header and backpatch it once their body is written.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use crate::error::{Error, Result};
use crate::types::{limits, ObjectId};

/// Saved offset of a document's reserved length header.
///
/// Returned by [`Encoder::begin_document`] and consumed by
/// [`Encoder::end_document`]. Holding the offset rather than a reference keeps
/// the buffer free for nested encodes in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a started document must be finished with end_document"]
pub struct DocumentStart(usize);

/// A BSON encoder that appends to an owned byte buffer.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Create a new encoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create a new encoder with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Current write position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Consume the encoder and return the buffer.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Reserve a document's length header.
    pub fn begin_document(&mut self) -> DocumentStart {
        let start = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        DocumentStart(start)
    }

    /// Append the trailing `0x00` and overwrite the reserved header with the
    /// document's final length. Returns that length.
    pub fn end_document(&mut self, start: DocumentStart) -> Result<usize> {
        self.buf.push(0);
        self.patch_length(start)
    }

    /// Overwrite the reserved header with the byte count written since it,
    /// header included, without appending a trailer.
    pub fn patch_length(&mut self, start: DocumentStart) -> Result<usize> {
        let len = self.buf.len() - start.0;
        if len > limits::MAX_DOCUMENT_SIZE {
            return Err(Error::MaxDocumentSizeExceeded);
        }
        self.buf[start.0..start.0 + 4].copy_from_slice(&(len as i32).to_le_bytes());
        Ok(len)
    }

    /// Write an element's type tag and field name.
    #[inline]
    pub fn write_element_header(&mut self, tag: u8, key: &str) -> Result<()> {
        self.write_byte(tag);
        self.write_cstring(key)
    }

    /// Write a nul-terminated string. Fails if `value` contains a `0x00`.
    pub fn write_cstring(&mut self, value: &str) -> Result<()> {
        if memchr::memchr(0, value.as_bytes()).is_some() {
            return Err(Error::InteriorNul(value.to_string()));
        }
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    /// Write a string payload: int32 byte count (including the nul), the
    /// UTF-8 bytes, then the nul.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = value.len() + 1;
        if len > limits::MAX_DOCUMENT_SIZE {
            return Err(Error::MaxDocumentSizeExceeded);
        }
        self.write_i32(len as i32);
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    /// Write a binary payload: int32 byte count, subtype, bytes.
    pub fn write_binary(&mut self, subtype: u8, bytes: &[u8]) -> Result<()> {
        if bytes.len() > limits::MAX_DOCUMENT_SIZE {
            return Err(Error::MaxDocumentSizeExceeded);
        }
        self.write_i32(bytes.len() as i32);
        self.write_byte(subtype);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Write a regex payload as two cstrings.
    pub fn write_regex(&mut self, pattern: &str, options: &str) -> Result<()> {
        self.write_cstring(pattern)?;
        self.write_cstring(options)
    }

    #[inline]
    pub fn write_object_id(&mut self, id: &ObjectId) {
        self.buf.extend_from_slice(&id.bytes());
    }

    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(u8::from(value));
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}
