//! PDF Trailer and Epilogue
//!
//! The `trailer` dictionary and the `startxref` marker that close a PDF
//! body (ISO 32000-1 Sections 7.5.5 and 7.5.4).

use super::lexer::Lexer;
use super::objects::{report_position, write_indent, Numeric, Object};
use super::reader::TopLevelObject;
use super::ParseResult;
use std::io::{self, Read, Write};

/// The trailer dictionary together with the byte offset at which it
/// appeared in the input
#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    pub dict: Object,
    pub start: u64,
}

impl Trailer {
    pub(crate) fn parse<R: Read>(lexer: &mut Lexer<R>) -> ParseResult<TopLevelObject> {
        let keyword = lexer.next_token()?;
        debug_assert!(keyword == b"trailer");
        // Force the next token so its start offset is known.
        lexer.peek_token()?;
        let start = lexer.last_token_position();
        let dict = Object::parse(lexer)?;
        Ok(TopLevelObject::Trailer(Trailer { dict, start }))
    }

    pub fn failed(&self) -> bool {
        self.dict.failed()
    }

    pub fn dump<W: Write>(&self, writer: &mut W, indent: usize) -> io::Result<()> {
        write_indent(writer, indent)?;
        writer.write_all(b"trailer\n")?;
        self.dict.dump(writer, indent + 1)
    }
}

/// The `startxref` epilogue giving the offset of the last xref table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartXRef {
    pub offset: u64,
}

impl StartXRef {
    pub(crate) fn parse<R: Read>(lexer: &mut Lexer<R>) -> ParseResult<TopLevelObject> {
        let keyword = lexer.next_token()?;
        debug_assert!(keyword == b"startxref");
        let token = lexer.next_token()?;
        match Numeric::from_token(token.bytes()).as_u64() {
            Some(offset) => Ok(TopLevelObject::StartXRef(StartXRef { offset })),
            None => Ok(TopLevelObject::Invalid(format!(
                "Broken startxref{}",
                report_position(lexer)
            ))),
        }
    }

    pub fn dump<W: Write>(&self, writer: &mut W, indent: usize) -> io::Result<()> {
        write_indent(writer, indent)?;
        write!(writer, "startxref\n{}\n%%EOF", self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PdfReader;
    use std::io::Cursor;

    #[test]
    fn test_parse_trailer_records_dict_offset() {
        let mut r = PdfReader::new(Cursor::new(b"trailer\n<< /Size 5 /Root 1 0 R >>".to_vec()));
        let TopLevelObject::Trailer(trailer) = r.read_top_level_object().unwrap() else {
            panic!("expected trailer")
        };
        // The recorded offset is where the dictionary begins.
        assert_eq!(trailer.start, 8);
        let dict = trailer.dict.as_dict().unwrap();
        assert_eq!(
            dict.get(b"Size").and_then(Object::as_numeric).and_then(Numeric::as_u64),
            Some(5)
        );
        assert!(!trailer.failed());
    }

    #[test]
    fn test_trailer_dump() {
        let mut r = PdfReader::new(Cursor::new(b"trailer << /Size 1 >>".to_vec()));
        let tlo = r.read_top_level_object().unwrap();
        assert_eq!(
            String::from_utf8(tlo.dump_to_vec()).unwrap(),
            "trailer\n  <<\n    /Size\n      1\n  >>"
        );
    }

    #[test]
    fn test_parse_startxref() {
        let mut r = PdfReader::new(Cursor::new(b"startxref\n18442\n%%EOF".to_vec()));
        let TopLevelObject::StartXRef(marker) = r.read_top_level_object().unwrap() else {
            panic!("expected startxref")
        };
        assert_eq!(marker.offset, 18442);
    }

    #[test]
    fn test_broken_startxref() {
        let mut r = PdfReader::new(Cursor::new(b"startxref\nnowhere".to_vec()));
        let TopLevelObject::Invalid(error) = r.read_top_level_object().unwrap() else {
            panic!("expected invalid")
        };
        assert!(error.starts_with("Broken startxref"));
    }

    #[test]
    fn test_startxref_dump() {
        let marker = StartXRef { offset: 99 };
        let mut out = Vec::new();
        marker.dump(&mut out, 0).unwrap();
        assert_eq!(out, b"startxref\n99\n%%EOF");
    }
}
