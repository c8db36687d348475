// ABOUTME: Error types for BSON encoding, decoding, and stream framing.
// ABOUTME: Each variant maps to a stable snake_case identifier used by the conformance tests.

use std::fmt;
use std::io;

/// The result type for BSON operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during BSON encoding or decoding.
#[derive(Debug)]
pub enum Error {
    /// Document shorter than the 5-byte minimum, or a declared length too
    /// small to hold the trailing `0x00`.
    TooShort,

    /// The leading int32 length does not match the byte count supplied.
    LengthMismatch { declared: i64, actual: usize },

    /// The stream ended cleanly before any byte of the next document.
    EndOfStream,

    /// The stream ended in the middle of a document body.
    UnexpectedEof,

    /// I/O error from the underlying stream, passed through unchanged.
    Io(io::Error),

    /// Exactly one byte remained in an element list.
    CursorExhausted,

    /// A cstring ran to the end of its buffer without a `0x00`.
    MissingTerminator,

    /// Not enough bytes (or an impossible length) for an element of this kind.
    Corrupt(&'static str),

    /// A length-prefixed payload declares more bytes than remain.
    PayloadOverrun {
        kind: &'static str,
        declared: usize,
        available: usize,
    },

    /// Unrecognized element type tag.
    UnknownElementType(u8),

    /// Invalid UTF-8 in a string payload or field name.
    InvalidUtf8,

    /// Boolean payload byte other than 0x00 or 0x01.
    InvalidBoolean(u8),

    /// Array keys are not exactly the indices `0..n`.
    CorruptArray(String),

    /// Repeated field name while `DuplicateKeyMode::Error` is in effect.
    DuplicateKey(String),

    /// Documents nested deeper than the configured limit.
    MaxDepthExceeded,

    /// Document larger than the configured (or format) limit.
    MaxDocumentSizeExceeded,

    /// Decode target is not a mapping or record.
    InvalidDestination(String),

    /// Top-level encode source was null or absent.
    EncodeNil,

    /// Top-level encode source is not a mapping.
    InvalidSource(String),

    /// A value the encoder cannot represent.
    UnsupportedType(String),

    /// Field name or regex component containing an interior `0x00`.
    InteriorNul(String),

    /// Custom error message (for serde integration).
    Custom(String),
}

impl Error {
    /// Returns the standardized error type name for test matching.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::TooShort => "too_short",
            Error::LengthMismatch { .. } => "length_mismatch",
            Error::EndOfStream => "end_of_stream",
            Error::UnexpectedEof => "unexpected_eof",
            Error::Io(_) => "io_error",
            Error::CursorExhausted => "cursor_exhausted",
            Error::MissingTerminator => "missing_terminator",
            Error::Corrupt(_) => "corrupt",
            Error::PayloadOverrun { .. } => "payload_overrun",
            Error::UnknownElementType(_) => "unknown_element_type",
            Error::InvalidUtf8 => "invalid_utf8",
            Error::InvalidBoolean(_) => "invalid_boolean",
            Error::CorruptArray(_) => "corrupt_array",
            Error::DuplicateKey(_) => "duplicate_key",
            Error::MaxDepthExceeded => "max_depth_exceeded",
            Error::MaxDocumentSizeExceeded => "max_document_size_exceeded",
            Error::InvalidDestination(_) => "invalid_destination",
            Error::EncodeNil => "encode_nil",
            Error::InvalidSource(_) => "invalid_source",
            Error::UnsupportedType(_) => "unsupported_type",
            Error::InteriorNul(_) => "interior_nul",
            Error::Custom(_) => "custom",
        }
    }

    /// True for the clean end-of-stream condition, which callers looping over
    /// a stream usually treat as termination rather than failure.
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TooShort => write!(f, "bson document too short"),
            Error::LengthMismatch { declared, actual } => {
                write!(f, "bson document length mismatch: header says {declared} bytes, have {actual}")
            }
            Error::EndOfStream => write!(f, "end of stream"),
            Error::UnexpectedEof => write!(f, "unexpected end of input"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::CursorExhausted => write!(f, "corrupt BSON, only 1 byte remains"),
            Error::MissingTerminator => write!(f, "corrupt BSON, cstring missing terminator"),
            Error::Corrupt(kind) => write!(f, "corrupt BSON reading {kind}"),
            Error::PayloadOverrun {
                kind,
                declared,
                available,
            } => write!(f, "corrupt {kind}: want {declared} bytes, have {available}"),
            Error::UnknownElementType(tag) => write!(f, "unknown element type 0x{tag:02x}"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            Error::InvalidBoolean(byte) => write!(f, "invalid boolean byte 0x{byte:02x}"),
            Error::CorruptArray(key) => write!(f, "corrupt array: unexpected key {key:?}"),
            Error::DuplicateKey(key) => write!(f, "duplicate key {key:?}"),
            Error::MaxDepthExceeded => write!(f, "maximum document depth exceeded"),
            Error::MaxDocumentSizeExceeded => write!(f, "maximum document size exceeded"),
            Error::InvalidDestination(kind) => write!(f, "invalid destination: {kind}"),
            Error::EncodeNil => write!(f, "encode of nil"),
            Error::InvalidSource(kind) => write!(f, "top-level value must be a document, got {kind}"),
            Error::UnsupportedType(kind) => write!(f, "unsupported type: {kind}"),
            Error::InteriorNul(text) => write!(f, "interior NUL in {text:?}"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

// io::Error has no PartialEq; two Io errors compare equal when their kinds match.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Io(a), Error::Io(b)) => a.kind() == b.kind(),
            (
                Error::LengthMismatch { declared: d1, actual: a1 },
                Error::LengthMismatch { declared: d2, actual: a2 },
            ) => d1 == d2 && a1 == a2,
            (
                Error::PayloadOverrun {
                    kind: k1,
                    declared: d1,
                    available: a1,
                },
                Error::PayloadOverrun {
                    kind: k2,
                    declared: d2,
                    available: a2,
                },
            ) => k1 == k2 && d1 == d2 && a1 == a2,
            (Error::Corrupt(a), Error::Corrupt(b)) => a == b,
            (Error::UnknownElementType(a), Error::UnknownElementType(b)) => a == b,
            (Error::InvalidBoolean(a), Error::InvalidBoolean(b)) => a == b,
            (Error::CorruptArray(a), Error::CorruptArray(b))
            | (Error::DuplicateKey(a), Error::DuplicateKey(b))
            | (Error::InvalidDestination(a), Error::InvalidDestination(b))
            | (Error::InvalidSource(a), Error::InvalidSource(b))
            | (Error::UnsupportedType(a), Error::UnsupportedType(b))
            | (Error::InteriorNul(a), Error::InteriorNul(b))
            | (Error::Custom(a), Error::Custom(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
