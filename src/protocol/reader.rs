//! Reply reader
//!
//! Pairs an inbound [`Buffer`] with a [`Parser`]: bytes go in with `feed`,
//! completed replies come out in arrival order.

use crate::buffer::Buffer;
use crate::error::ProtocolError;

use super::parser::{ParseOptions, Parser, ProtocolVersion};
use super::value::Value;

/// Inbound buffer plus parser state
#[derive(Debug, Default)]
pub struct ReplyReader {
    buffer: Buffer,
    parser: Parser,
}

impl ReplyReader {
    pub fn new(version: ProtocolVersion, options: ParseOptions) -> Self {
        Self {
            buffer: Buffer::new(),
            parser: Parser::new(version, options),
        }
    }

    /// Append raw bytes received from the transport
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete reply, if the buffered bytes hold one
    pub fn next_reply(&mut self) -> Result<Option<Value>, ProtocolError> {
        self.parser.parse(&mut self.buffer)
    }

    /// Every complete reply currently buffered, in order
    pub fn drain(&mut self) -> Result<Vec<Value>, ProtocolError> {
        let mut replies = Vec::new();
        while let Some(reply) = self.next_reply()? {
            replies.push(reply);
        }
        Ok(replies)
    }

    /// `feed` followed by `drain`
    pub fn feed_and_drain(&mut self, bytes: &[u8]) -> Result<Vec<Value>, ProtocolError> {
        self.feed(bytes);
        self.drain()
    }

    /// Bytes received but not yet consumed by the parser
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a reply has been started but not finished
    pub fn is_mid_reply(&self) -> bool {
        !self.parser.is_idle() || !self.buffer.is_empty()
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.parser.set_version(version);
    }

    /// Drop all buffered bytes and partial state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.parser.reset();
    }
}
