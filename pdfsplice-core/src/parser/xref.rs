//! PDF Cross-Reference Tables
//!
//! Parses the classic `xref` table according to ISO 32000-1 Section
//! 7.5.4. The fixed-width 20-byte entries are carried verbatim: this
//! parser splits the file into constructs, it does not resolve objects,
//! so there is nothing to gain from interpreting individual entries.

use super::lexer::Lexer;
use super::objects::{report_position, write_indent, Numeric};
use super::reader::TopLevelObject;
use super::ParseResult;
use std::io::{self, Read, Write};

/// One contiguous subsection of an xref table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// First object number covered by this subsection
    pub start: u64,
    /// Number of 20-byte entries
    pub count: u64,
    /// The raw entry bytes, exactly `20 * count` of them
    pub data: Vec<u8>,
}

/// A cross-reference table: an ordered run of subsections
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XRefTable {
    pub sections: Vec<Section>,
}

impl XRefTable {
    /// Parse the table following an `xref` keyword. The terminating
    /// `trailer` keyword is left unconsumed for the next dispatch
    /// cycle.
    pub(crate) fn parse<R: Read>(lexer: &mut Lexer<R>) -> ParseResult<TopLevelObject> {
        let keyword = lexer.next_token()?;
        debug_assert!(keyword == b"xref");
        lexer.skip_past_eol()?;
        let mut sections = Vec::new();
        loop {
            let token = lexer.peek_token()?;
            if token.is_empty() {
                return Ok(TopLevelObject::Invalid(
                    "End of input while reading xref table".to_string(),
                ));
            }
            if token == b"trailer" {
                break;
            }
            lexer.consume_token()?;
            let Some(start) = Numeric::from_token(token.bytes()).as_u64() else {
                return Ok(TopLevelObject::Invalid(format!(
                    "Broken xref subsection header (start){}",
                    report_position(lexer)
                )));
            };
            let count_token = lexer.next_token()?;
            let Some(count) = Numeric::from_token(count_token.bytes()).as_u64() else {
                return Ok(TopLevelObject::Invalid(format!(
                    "Broken xref subsection header (count){}",
                    report_position(lexer)
                )));
            };
            lexer.skip_past_eol()?;
            let len = 20 * count as usize;
            let data = lexer.read_bytes(len)?;
            if data.len() < len {
                return Ok(TopLevelObject::Invalid(
                    "End of input while reading xref table".to_string(),
                ));
            }
            sections.push(Section { start, count, data });
        }
        Ok(TopLevelObject::XRefTable(XRefTable { sections }))
    }

    pub fn dump<W: Write>(&self, writer: &mut W, indent: usize) -> io::Result<()> {
        write_indent(writer, indent)?;
        writer.write_all(b"xref\n")?;
        for section in &self.sections {
            writeln!(writer, "{} {}", section.start, section.count)?;
            writer.write_all(&section.data)?;
        }
        Ok(())
    }
}
