//! PDF Stream Filters
//!
//! Resolves a stream's `/Filter` entry into a pipeline of byte-oriented
//! decoders (ISO 32000-1 Section 7.4). `FlateDecode` is the decoder
//! implemented here; any other filter name terminates the chain, which
//! then hands out the partially decoded bytes together with the name of
//! the innermost encoding still applied, so a caller can at least pick
//! a sensible file extension for them.

use super::objects::{Object, Stream};
use flate2::read::ZlibDecoder;
use log::debug;
use std::cell::Cell;
use std::io::{self, Cursor, Read};
use std::rc::Rc;

/// Error from the decoding side of a filter chain
#[derive(Debug, thiserror::Error)]
#[error("{component}: {message} at position {offset}")]
pub struct DecodeError {
    /// Which decoder failed, e.g. `zlib`
    pub component: &'static str,
    pub message: String,
    /// Offset into the encoded payload at which the failure surfaced
    pub offset: u64,
}

/// Standard stream filter names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    ASCIIHexDecode,
    ASCII85Decode,
    LZWDecode,
    FlateDecode,
    RunLengthDecode,
    CCITTFaxDecode,
    JBIG2Decode,
    DCTDecode,
    JPXDecode,
    Crypt,
}

impl Filter {
    /// Parse a filter from its name bytes
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ASCIIHexDecode" => Some(Filter::ASCIIHexDecode),
            b"ASCII85Decode" => Some(Filter::ASCII85Decode),
            b"LZWDecode" => Some(Filter::LZWDecode),
            b"FlateDecode" => Some(Filter::FlateDecode),
            b"RunLengthDecode" => Some(Filter::RunLengthDecode),
            b"CCITTFaxDecode" => Some(Filter::CCITTFaxDecode),
            b"JBIG2Decode" => Some(Filter::JBIG2Decode),
            b"DCTDecode" => Some(Filter::DCTDecode),
            b"JPXDecode" => Some(Filter::JPXDecode),
            b"Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    /// File extension conventionally matching data still carrying this
    /// encoding
    pub fn extension(self) -> &'static str {
        match self {
            Filter::DCTDecode => "jpg",
            Filter::JBIG2Decode => "jbig2",
            Filter::JPXDecode => "jpx",
            _ => "data",
        }
    }
}

/// Counts the bytes handed out of the raw payload, so decode errors can
/// report how far into the encoded data they happened.
struct CountingReader<R> {
    inner: R,
    consumed: Rc<Cell<u64>>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.set(self.consumed.get() + n as u64);
        Ok(n)
    }
}

/// The decoder pipeline for one stream's payload.
///
/// Reading from the chain yields the payload with every recognized
/// filter peeled off, innermost decoder last. Filters are applied in
/// the order `/Filter` lists them; walking stops at the first
/// unrecognized name, which is then reported as the innermost remaining
/// encoding.
pub struct DecoderChain<'a> {
    reader: Box<dyn Read + 'a>,
    consumed: Rc<Cell<u64>>,
    complete: bool,
    remaining: Option<Vec<u8>>,
}

impl<'a> std::fmt::Debug for DecoderChain<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderChain")
            .field("consumed", &self.consumed)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

impl<'a> DecoderChain<'a> {
    pub fn new(stream: &'a Stream) -> Result<Self, DecodeError> {
        let invalid_filter = || DecodeError {
            component: "filter",
            message: "Invalid /Filter".to_string(),
            offset: 0,
        };
        let names: Vec<&[u8]> = match stream.dict.get(b"Filter") {
            None => Vec::new(),
            Some(Object::Name(name)) => vec![name.as_bytes()],
            Some(Object::Array(array)) => {
                let mut names = Vec::with_capacity(array.items.len());
                for item in &array.items {
                    match item {
                        Object::Name(name) => names.push(name.as_bytes()),
                        _ => return Err(invalid_filter()),
                    }
                }
                names
            }
            Some(_) => return Err(invalid_filter()),
        };

        let consumed = Rc::new(Cell::new(0));
        let mut reader: Box<dyn Read + 'a> = Box::new(CountingReader {
            inner: Cursor::new(stream.data.as_slice()),
            consumed: Rc::clone(&consumed),
        });
        let mut complete = true;
        let mut remaining = None;
        for name in names {
            match Filter::from_name(name) {
                Some(Filter::FlateDecode) => {
                    reader = Box::new(ZlibDecoder::new(reader));
                }
                _ => {
                    debug!(
                        "filter /{} not decoded, leaving data encoded",
                        String::from_utf8_lossy(name)
                    );
                    complete = false;
                    remaining = Some(name.to_vec());
                    break;
                }
            }
        }
        Ok(DecoderChain {
            reader,
            consumed,
            complete,
            remaining,
        })
    }

    /// True when every listed filter was recognized and stacked into
    /// the chain
    pub fn complete(&self) -> bool {
        self.complete
    }

    /// Name of the innermost filter still applied to the data the chain
    /// yields, when the chain is not complete
    pub fn remaining_filter(&self) -> Option<&[u8]> {
        self.remaining.as_deref()
    }

    /// File extension matching the bytes this chain yields
    pub fn suggested_extension(&self) -> &'static str {
        match self.remaining_filter() {
            None => "data",
            Some(name) => Filter::from_name(name).map_or("data", Filter::extension),
        }
    }

    /// Decode everything the chain has to offer
    pub fn decode_all(&mut self) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::new();
        match self.reader.read_to_end(&mut out) {
            Ok(_) => Ok(out),
            Err(e) => Err(DecodeError {
                component: "zlib",
                message: e.to_string(),
                offset: self.consumed.get(),
            }),
        }
    }
}

impl Read for DecoderChain<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}
