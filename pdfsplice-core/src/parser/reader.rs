//! PDF Reader
//!
//! Reads the sequence of top-level constructs that make up the body of
//! a PDF file: named objects, cross-reference tables, trailer
//! dictionaries and the `startxref` epilogue. A construct that cannot
//! be parsed yields an explicit [`TopLevelObject::Invalid`] marker and
//! the reader resynchronizes on the next `endobj` keyword, so one bad
//! object never takes the rest of the file down with it.

use super::lexer::{char_class, chop_eol, CharClass, Lexer};
use super::objects::{dump_error_note, report_position, write_indent, Dictionary, Numeric, Object};
use super::trailer::{StartXRef, Trailer};
use super::xref::XRefTable;
use super::{header::Version, ParseResult};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::Path;

/// The `num gen obj ... endobj` construct
#[derive(Debug, Clone, PartialEq)]
pub struct NamedObject {
    pub num: u64,
    pub gen: u64,
    pub contents: Object,
    /// Partial-parse annotation; empty when the construct was clean
    pub error: String,
}

impl NamedObject {
    pub fn new(num: u64, gen: u64, contents: Object, error: String) -> Self {
        Self {
            num,
            gen,
            contents,
            error,
        }
    }

    pub fn failed(&self) -> bool {
        self.contents.failed() || !self.error.is_empty()
    }

    pub fn dump<W: Write>(&self, writer: &mut W, indent: usize) -> io::Result<()> {
        write_indent(writer, indent)?;
        write!(writer, "{} {} obj\n", self.num, self.gen)?;
        self.contents.dump(writer, indent + 1)?;
        writer.write_all(b"\n")?;
        dump_error_note(writer, indent, &self.error, true)?;
        write_indent(writer, indent)?;
        writer.write_all(b"endobj")
    }
}

/// One top-level construct of a PDF file
#[derive(Debug, Clone, PartialEq)]
pub enum TopLevelObject {
    /// End-of-input sentinel
    Null,
    NamedObject(NamedObject),
    XRefTable(XRefTable),
    Trailer(Trailer),
    StartXRef(StartXRef),
    Invalid(String),
}

impl TopLevelObject {
    pub fn failed(&self) -> bool {
        match self {
            TopLevelObject::Null | TopLevelObject::XRefTable(_) | TopLevelObject::StartXRef(_) => {
                false
            }
            TopLevelObject::NamedObject(obj) => obj.failed(),
            TopLevelObject::Trailer(t) => t.failed(),
            TopLevelObject::Invalid(_) => true,
        }
    }

    pub fn dump<W: Write>(&self, writer: &mut W, indent: usize) -> io::Result<()> {
        match self {
            TopLevelObject::Null => {
                write_indent(writer, indent)?;
                writer.write_all(b"null")
            }
            TopLevelObject::NamedObject(obj) => obj.dump(writer, indent),
            TopLevelObject::XRefTable(table) => table.dump(writer, indent),
            TopLevelObject::Trailer(t) => t.dump(writer, indent),
            TopLevelObject::StartXRef(s) => s.dump(writer, indent),
            TopLevelObject::Invalid(error) => {
                write_indent(writer, indent)?;
                writer.write_all(b"null\n")?;
                write_indent(writer, indent)?;
                write!(writer, "% !!! {error}")
            }
        }
    }

    pub fn dump_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.dump(&mut out, 0).expect("writing to a Vec cannot fail");
        out
    }
}

/// Reader over the top-level constructs of a PDF byte source
pub struct PdfReader<R> {
    tokens: Lexer<R>,
}

impl PdfReader<File> {
    /// Open a PDF file for reading
    pub fn open(path: impl AsRef<Path>) -> ParseResult<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read + Seek> PdfReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            tokens: Lexer::new(reader),
        }
    }

    /// Try to read the `%PDF-M.m` header line. Returns `None`, without
    /// consuming anything, when the input does not start with `%`; the
    /// body parser does not require the header to be present.
    pub fn read_version(&mut self) -> ParseResult<Option<Version>> {
        if self.tokens.peek_byte()? != Some(b'%') {
            return Ok(None);
        }
        let line = self.tokens.read_line()?;
        Ok(Version::from_header_line(&line))
    }

    /// Read the next top-level construct.
    ///
    /// [`TopLevelObject::Null`] signals end of input. On an
    /// [`TopLevelObject::Invalid`] result the reader has already
    /// resynchronized past the next `endobj`, so the caller can simply
    /// keep reading.
    pub fn read_top_level_object(&mut self) -> ParseResult<TopLevelObject> {
        let object = self.dispatch()?;
        if let TopLevelObject::Invalid(error) = &object {
            warn!("unparseable construct ({error}), scanning for endobj");
            if !self.skip_to_endobj()? {
                debug!("no endobj found before end of input");
            }
        }
        Ok(object)
    }

    fn dispatch(&mut self) -> ParseResult<TopLevelObject> {
        let token = self.tokens.peek_token()?;
        if token.is_empty() {
            Ok(TopLevelObject::Null)
        } else if Numeric::from_token(token.bytes()).uintegral() {
            self.parse_named_object()
        } else if token == b"xref" {
            XRefTable::parse(&mut self.tokens)
        } else if token == b"trailer" {
            Trailer::parse(&mut self.tokens)
        } else if token == b"startxref" {
            StartXRef::parse(&mut self.tokens)
        } else {
            Ok(TopLevelObject::Invalid(format!(
                "Garbage or unexpected token{}",
                report_position(&self.tokens)
            )))
        }
    }

    fn parse_named_object(&mut self) -> ParseResult<TopLevelObject> {
        let num = Numeric::from_token(self.tokens.next_token()?.bytes());
        let Some(num) = num.as_u64() else {
            return Ok(TopLevelObject::Invalid(format!(
                "Misshaped named object header (num){}",
                report_position(&self.tokens)
            )));
        };
        let gen = Numeric::from_token(self.tokens.next_token()?.bytes());
        let Some(gen) = gen.as_u64() else {
            return Ok(TopLevelObject::Invalid(format!(
                "Misshaped named object header (gen){}",
                report_position(&self.tokens)
            )));
        };
        if self.tokens.next_token()? != b"obj" {
            return Ok(TopLevelObject::Invalid(format!(
                "Misshaped named object header (obj){}",
                report_position(&self.tokens)
            )));
        }
        let mut contents = Object::parse(&mut self.tokens)?;
        if matches!(contents, Object::Dictionary(_)) && self.tokens.peek_token()? == b"stream" {
            let Object::Dictionary(dict) = contents else {
                unreachable!()
            };
            contents = self.parse_stream_payload(dict)?;
        }
        let end = self.tokens.next_token()?;
        let error = if end == b"endobj" {
            String::new()
        } else if end.is_empty() {
            "End of input where endobj expected".to_string()
        } else {
            format!("endobj not found{}", report_position(&self.tokens))
        };
        Ok(TopLevelObject::NamedObject(NamedObject {
            num,
            gen,
            contents,
            error,
        }))
    }

    /// Read the byte payload following a dictionary's `stream` keyword.
    ///
    /// With a usable `/Length` the read is length-directed; otherwise
    /// the payload is recovered by scanning for the `endstream`
    /// sentinel, rejecting matches that sit inside a longer regular run.
    fn parse_stream_payload(&mut self, dict: Dictionary) -> ParseResult<Object> {
        const SENTINEL: &[u8] = b"endstream";
        let keyword = self.tokens.next_token()?;
        debug_assert!(keyword == b"stream");
        self.tokens.skip_to_lf()?;
        let mut data = Vec::new();
        let mut error = String::new();
        let length = dict
            .get(b"Length")
            .and_then(Object::as_numeric)
            .and_then(Numeric::as_u64);
        if let Some(length) = length {
            data = self.tokens.read_bytes(length as usize)?;
            if (data.len() as u64) < length {
                error = format!(
                    "End of input during reading stream data, read {} bytes",
                    data.len()
                );
            } else if self.tokens.next_token()? != b"endstream" {
                error = format!("endstream not found{}", report_position(&self.tokens));
            }
        } else {
            loop {
                let line = self.tokens.read_raw_line()?;
                if line.is_empty() {
                    error = "End of input during reading stream data".to_string();
                    break;
                }
                // The sentinel need not be alone on its line when the
                // file is broken anyway.
                let Some(at) = find_bytes(&line, SENTINEL) else {
                    data.extend_from_slice(&line);
                    continue;
                };
                data.extend_from_slice(&line[..at]);
                if at + SENTINEL.len() == line.len() {
                    break;
                }
                let backtrack = (line.len() - at - SENTINEL.len()) as i64;
                self.tokens.seek_relative(-backtrack)?;
                match self.tokens.peek_byte()? {
                    Some(b) if char_class(b) == CharClass::Regular => {
                        debug!(
                            "spurious endstream match at {}, continuing scan",
                            self.tokens.position()
                        );
                        data.extend_from_slice(SENTINEL);
                    }
                    _ => break,
                }
            }
            // The EOL preceding endstream is not part of the payload.
            chop_eol(&mut data);
        }
        Ok(Object::Stream(super::objects::Stream { dict, data, error }))
    }

    /// Scan forward for a proper `endobj` token and position the source
    /// just past it. Returns `false` only at end of input.
    pub fn skip_to_endobj(&mut self) -> ParseResult<bool> {
        const SENTINEL: &[u8] = b"endobj";
        self.tokens.flush_pushback()?;
        loop {
            let line = self.tokens.read_raw_line()?;
            if line.is_empty() {
                return Ok(false);
            }
            let Some(at) = find_bytes(&line, SENTINEL) else {
                continue;
            };
            if at + SENTINEL.len() == line.len() {
                return Ok(true);
            }
            let backtrack = (line.len() - at - SENTINEL.len()) as i64;
            self.tokens.seek_relative(-backtrack)?;
            match self.tokens.peek_byte()? {
                Some(b) if char_class(b) == CharClass::Regular => {
                    // Part of a longer run, keep scanning from here.
                }
                _ => return Ok(true),
            }
        }
    }

    /// Offset of the next unconsumed byte
    pub fn position(&self) -> u64 {
        self.tokens.position()
    }
}

/// Find the first occurrence of `needle` in `haystack`
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
