//! PDF Header
//!
//! The `%PDF-M.m` version line (ISO 32000-1 Section 7.5.2). A missing
//! or mismatched header is a warning for the surrounding program, never
//! a parse failure.

use std::fmt;
use std::io::{self, Write};

/// PDF file format version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// Parse a header line of the exact shape `%PDF-M.m` (terminator
    /// already removed)
    pub fn from_header_line(line: &[u8]) -> Option<Version> {
        let digits = line.strip_prefix(b"%PDF-")?;
        // The version components are single digits; anything longer is
        // not a header this parser recognizes.
        let &[major, b'.', minor] = digits else {
            return None;
        };
        if !major.is_ascii_digit() || !minor.is_ascii_digit() {
            return None;
        }
        Some(Version {
            major: u32::from(major - b'0'),
            minor: u32::from(minor - b'0'),
        })
    }

    /// Write the header line plus the conventional binary-transfer
    /// marker comment of four bytes above 127
    pub fn write_header<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "%PDF-{}.{}", self.major, self.minor)?;
        writer.write_all(b"%\x82\x82\x82\x82\n")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
