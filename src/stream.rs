// ABOUTME: Length-prefixed BSON document framing over byte streams.
// ABOUTME: Reads and writes one whole document per call on any std::io Read or Write.

use crate::decoder::{document_elements, DecoderConfig};
use crate::error::{Error, Result};
use crate::value::Document;
use crate::{decode_document_with_config, encode_document, from_slice_with_config, to_vec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Read, Write};
use tracing::{debug, trace};

/// Upper bound on the buffer reserved before a frame's body has arrived.
const INITIAL_FRAME_CAPACITY: usize = 16 * 1024;

/// Reads BSON documents one at a time from a byte stream.
///
/// Each call consumes exactly one frame: the 4-byte length header and the
/// body it announces. After an error the stream position is wherever the
/// failed read left it.
#[derive(Debug)]
pub struct StreamDecoder<R: Read> {
    reader: R,
    config: DecoderConfig,
}

impl<R: Read> StreamDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, DecoderConfig::default())
    }

    pub fn with_config(reader: R, config: DecoderConfig) -> Self {
        Self { reader, config }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next whole document, header included, without decoding it.
    ///
    /// # Errors
    ///
    /// - [`Error::EndOfStream`] if the stream ends before the first header byte
    /// - [`Error::Io`] with `UnexpectedEof` if it ends inside the header
    /// - [`Error::TooShort`] if the header announces fewer than 5 bytes
    /// - [`Error::UnexpectedEof`] if it ends inside the body
    #[allow(clippy::cast_sign_loss)]
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut header = [0u8; 4];
        let filled = self.read_header(&mut header)?;
        match filled {
            0 => return Err(Error::EndOfStream),
            4 => {}
            _ => {
                debug!(bytes = filled, "stream ended inside BSON length header");
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside BSON length header",
                )));
            }
        }

        let declared = i32::from_le_bytes(header);
        let remaining = i64::from(declared) - 4;
        if remaining < 1 {
            debug!(declared, "rejecting BSON frame below minimum size");
            return Err(Error::TooShort);
        }
        let total = declared as usize;
        if total > self.config.max_document_size {
            debug!(declared, limit = self.config.max_document_size, "rejecting oversized BSON frame");
            return Err(Error::MaxDocumentSizeExceeded);
        }

        let mut frame = Vec::with_capacity(total.min(INITIAL_FRAME_CAPACITY));
        frame.extend_from_slice(&header);
        let read = (&mut self.reader).take(remaining as u64).read_to_end(&mut frame)?;
        if (read as i64) < remaining {
            debug!(declared, read, "stream ended inside BSON document body");
            return Err(Error::UnexpectedEof);
        }
        trace!(bytes = total, "read BSON frame");
        Ok(frame)
    }

    /// Fill `header` until it is full or the stream ends; returns the byte count.
    fn read_header(&mut self, header: &mut [u8; 4]) -> Result<usize> {
        let mut filled = 0;
        while filled < header.len() {
            match self.reader.read(&mut header[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(filled)
    }

    /// Read and decode the next document into any map or struct type.
    pub fn decode_next<T: DeserializeOwned>(&mut self) -> Result<T> {
        let frame = self.read_frame()?;
        from_slice_with_config(&frame, self.config.clone())
    }

    /// Read and decode the next document into a [`Document`].
    pub fn decode_next_document(&mut self) -> Result<Document> {
        let frame = self.read_frame()?;
        decode_document_with_config(&frame, self.config.clone())
    }

    /// Iterate over the remaining documents. Iteration ends at a clean end of
    /// stream, or after yielding the first error.
    pub fn documents(&mut self) -> Documents<'_, R> {
        Documents {
            decoder: self,
            done: false,
        }
    }
}

/// Iterator returned by [`StreamDecoder::documents`].
pub struct Documents<'a, R: Read> {
    decoder: &'a mut StreamDecoder<R>,
    done: bool,
}

impl<R: Read> Iterator for Documents<'_, R> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.decode_next_document() {
            Ok(document) => Some(Ok(document)),
            Err(err) => {
                self.done = true;
                if err.is_end_of_stream() {
                    None
                } else {
                    Some(Err(err))
                }
            }
        }
    }
}

/// Writes BSON documents one at a time to a byte stream.
///
/// Each document is encoded completely in memory before any byte is written,
/// so an encode error never leaves a partial frame on the stream.
#[derive(Debug)]
pub struct StreamEncoder<W: Write> {
    writer: W,
}

impl<W: Write> StreamEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encode a map or struct and write it as one frame.
    pub fn encode_next<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let bytes = to_vec(value)?;
        self.emit(&bytes)
    }

    /// Encode a [`Document`] and write it as one frame.
    pub fn encode_document(&mut self, document: &Document) -> Result<()> {
        let bytes = encode_document(document)?;
        self.emit(&bytes)
    }

    /// Write an already-encoded document. Its framing is checked first so the
    /// stream stays readable.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        document_elements(frame)?;
        self.emit(frame)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn emit(&mut self, frame: &[u8]) -> Result<()> {
        self.writer.write_all(frame)?;
        trace!(bytes = frame.len(), "wrote BSON frame");
        Ok(())
    }
}
