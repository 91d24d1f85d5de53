//! # pdfsplice
//!
//! A tolerant, byte-oriented parser and serializer for the object
//! stream that forms the body of a PDF 1.x file.
//!
//! The parser reads the sequence of top-level constructs — named
//! objects, cross-reference tables, trailer dictionaries and the
//! `startxref` epilogue — and yields a structured value for each.
//! Malformed input never aborts the run: syntax problems are recorded
//! as error annotations on the nodes they were found in, and the reader
//! resynchronizes on the next `endobj` keyword. Every value can be
//! written back out in the canonical surface syntax, faithfully enough
//! that re-parsing yields an equivalent value.
//!
//! ## Reading a file
//!
//! ```rust,no_run
//! use pdfsplice::{PdfReader, TopLevelObject};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = PdfReader::open("document.pdf")?;
//! if let Some(version) = reader.read_version()? {
//!     println!("PDF version {version}");
//! }
//! loop {
//!     match reader.read_top_level_object()? {
//!         TopLevelObject::Null => break,
//!         TopLevelObject::NamedObject(obj) => {
//!             println!("object {} {}", obj.num, obj.gen);
//!         }
//!         other => println!("{}", String::from_utf8_lossy(&other.dump_to_vec())),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Decoding stream payloads
//!
//! A [`Stream`] value carries its payload undecoded; the
//! [`DecoderChain`] resolves the `/Filter` entry into a pipeline of
//! decoders, and [`ObjectStream`] re-enters the parser on the decoded
//! payload of a `/Type /ObjStm` stream.

pub mod parser;

pub use parser::{
    char_class, Array, CharClass, DecodeError, DecoderChain, Dictionary, Filter, Lexer, Name,
    NamedObject, Numeric, ObjRef, Object, ObjectStream, ObjectStreamError, ParseError,
    ParseResult, PdfReader, PdfString, Section, StartXRef, Stream, Token, TopLevelObject, Trailer,
    Version, XRefTable,
};
