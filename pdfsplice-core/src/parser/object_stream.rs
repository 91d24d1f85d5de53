//! PDF Object Stream Parser
//!
//! Reads the named objects embedded in a `/Type /ObjStm` stream
//! (ISO 32000-1 Section 7.5.7). The decoded payload starts with `N`
//! pairs of plain-text numbers (object number, relative offset); the
//! object bodies follow from the `/First` byte offset onwards. The
//! offsets are not used: objects are trusted to appear in header
//! order.

use super::filters::{DecodeError, DecoderChain};
use super::lexer::Lexer;
use super::objects::{Numeric, Object, Stream};
use super::reader::{NamedObject, TopLevelObject};
use super::{ParseError, ParseResult};

/// Errors raised while opening or rewinding an object stream
#[derive(Debug, thiserror::Error)]
pub enum ObjectStreamError {
    #[error("Couldn't unpack object stream")]
    Incomplete,

    #[error("Object stream lacks required fields")]
    MissingFields,

    #[error("Broken object stream header")]
    BrokenHeader,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Reader over the named objects embedded in an object stream
pub struct ObjectStream<'a> {
    stream: &'a Stream,
    tokens: Lexer<DecoderChain<'a>>,
    /// Object numbers from the header, in order
    nums: Vec<u64>,
    /// Byte offset of object 0's body within the decoded payload
    first: u64,
    ix: usize,
    failed: bool,
}

impl<'a> ObjectStream<'a> {
    /// Unpack the stream and read the `N`-pair header
    pub fn new(stream: &'a Stream) -> Result<Self, ObjectStreamError> {
        let chain = DecoderChain::new(stream)?;
        if !chain.complete() {
            return Err(ObjectStreamError::Incomplete);
        }
        let count = stream
            .dict
            .get(b"N")
            .and_then(Object::as_numeric)
            .and_then(Numeric::as_u64);
        let first = stream
            .dict
            .get(b"First")
            .and_then(Object::as_numeric)
            .and_then(Numeric::as_u64);
        let (Some(count), Some(first)) = (count, first) else {
            return Err(ObjectStreamError::MissingFields);
        };
        let mut tokens = Lexer::new(chain);
        let mut nums = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let num = Numeric::from_token(tokens.next_token()?.bytes())
                .as_u64()
                .ok_or(ObjectStreamError::BrokenHeader)?;
            let offset_token = tokens.next_token()?;
            Numeric::from_token(offset_token.bytes())
                .as_u64()
                .ok_or(ObjectStreamError::BrokenHeader)?;
            nums.push(num);
        }
        Ok(ObjectStream {
            stream,
            tokens,
            nums,
            first,
            ix: 0,
            failed: false,
        })
    }

    /// Number of objects the stream claims to hold
    pub fn len(&self) -> usize {
        self.nums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nums.is_empty()
    }

    /// Read the next embedded object as a `NamedObject` with generation
    /// 0. Returns `TopLevelObject::Null` once all objects have been
    /// yielded, and `TopLevelObject::Invalid` after a parse failure has
    /// marked the reader failed.
    pub fn read(&mut self) -> ParseResult<TopLevelObject> {
        if self.failed {
            return Ok(TopLevelObject::Invalid(
                "Read on a failed ObjStream".to_string(),
            ));
        }
        if self.ix == self.nums.len() {
            return Ok(TopLevelObject::Null);
        }
        let contents = Object::parse(&mut self.tokens)?;
        if contents.failed() {
            self.failed = true;
            return Ok(TopLevelObject::Invalid(format!(
                "Error reading object stream element at {}",
                self.tokens.last_token_position()
            )));
        }
        let num = self.nums[self.ix];
        self.ix += 1;
        Ok(TopLevelObject::NamedObject(NamedObject::new(
            num,
            0,
            contents,
            String::new(),
        )))
    }

    /// Start over from the first embedded object.
    ///
    /// The decoder is forward-only, so the whole chain is rebuilt and
    /// `/First` bytes are skipped to get past the header again.
    pub fn rewind(&mut self) -> Result<(), ObjectStreamError> {
        let chain = DecoderChain::new(self.stream)?;
        let mut tokens = Lexer::new(chain);
        let mut skipped = 0;
        while skipped < self.first {
            if tokens.read_byte().map_err(ObjectStreamError::Parse)?.is_none() {
                break;
            }
            skipped += 1;
        }
        self.tokens = tokens;
        self.ix = 0;
        self.failed = false;
        Ok(())
    }
}
