//! PDF Parser Module
//!
//! A tolerant parser for the cross-reference-addressed object stream that
//! forms the body of a PDF 1.x file. Malformed input never aborts the
//! parse: errors are recorded on the nodes they were found in, and the
//! reader resynchronizes on the next `endobj` keyword.

pub mod filters;
pub mod header;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod reader;
pub mod trailer;
pub mod xref;

pub use self::filters::{DecodeError, DecoderChain, Filter};
pub use self::header::Version;
pub use self::lexer::{char_class, CharClass, Lexer, Token};
pub use self::object_stream::{ObjectStream, ObjectStreamError};
pub use self::objects::{Array, Dictionary, Name, Numeric, ObjRef, Object, PdfString, Stream};
pub use self::reader::{NamedObject, PdfReader, TopLevelObject};
pub use self::trailer::{StartXRef, Trailer};
pub use self::xref::{Section, XRefTable};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Out-of-band parser errors.
///
/// Syntactic problems in the input are not reported here; they are
/// recorded in-band as error annotations on the parsed nodes (see
/// [`Object::Invalid`] and the `error` fields of the composite types).
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Seek out of range: {offset} from position {position}")]
    SeekOutOfRange { position: u64, offset: i64 },
}
