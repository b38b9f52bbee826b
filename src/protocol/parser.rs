//! Reply parser
//!
//! An incremental, iterative state machine over the inbound [`Buffer`].
//!
//! ## How it resumes
//! Each call looks at the unread bytes and tries to complete one *token*:
//! a scalar reply, a length-prefixed string, or a composite header. A token
//! is consumed only once it is complete, so an incomplete token is left in
//! the buffer untouched for the next call.
//!
//! Composite headers (`*`, `%`, `~`, `>`) are consumed as soon as their
//! count line is complete and push a frame onto an explicit stack. Each
//! completed child is appended to the top frame; a full frame is popped and
//! becomes a child of the frame below. The stack is empty exactly when no
//! reply is partially parsed, and nothing is ever parsed twice.
//!
//! ```text
//!  *2\r\n  $3\r\nfoo\r\n  *1\r\n  :7\r\n
//!  push    child          push    child → pop → child → pop → Array
//! ```
//!
//! No recursion is involved, so nesting depth costs heap, not stack. Depth is
//! still capped by [`ParseOptions::max_depth`].

use bytes::Bytes;

use crate::buffer::Buffer;
use crate::error::ProtocolError;

use super::value::Value;

/// Default maximum nesting depth of composite replies
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default maximum bulk string length (512 MB, the server's own limit)
pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Default maximum element count of a single composite
pub const DEFAULT_MAX_ELEMENTS: usize = u32::MAX as usize;

/// Default maximum length of an unterminated line (64 KB)
pub const DEFAULT_MAX_INLINE_LEN: usize = 64 * 1024;

/// Children preallocated per frame, regardless of the declared count
const PREALLOC_LIMIT: usize = 64;

/// Which reply types are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    /// RESP2 only: `+ - : $ *`
    #[default]
    Resp2,

    /// RESP2 plus `_ , # ( = ! % ~ >`
    Resp3,
}

/// Resource limits for the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting depth of composites
    pub max_depth: usize,

    /// Maximum declared length of a bulk, verbatim or bulk-error string
    pub max_bulk_len: usize,

    /// Maximum declared element count of one composite
    pub max_elements: usize,

    /// Maximum bytes buffered while waiting for a line terminator
    pub max_inline_len: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseOptions {
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
            max_elements: DEFAULT_MAX_ELEMENTS,
            max_inline_len: DEFAULT_MAX_INLINE_LEN,
        }
    }

    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub const fn max_bulk_len(mut self, len: usize) -> Self {
        self.max_bulk_len = len;
        self
    }

    pub const fn max_elements(mut self, count: usize) -> Self {
        self.max_elements = count;
        self
    }

    pub const fn max_inline_len(mut self, len: usize) -> Self {
        self.max_inline_len = len;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregateKind {
    Array,
    Map,
    Set,
    Push,
}

impl AggregateKind {
    fn build(self, children: Vec<Value>) -> Value {
        match self {
            AggregateKind::Array => Value::Array(children),
            AggregateKind::Set => Value::Set(children),
            AggregateKind::Push => Value::Push(children),
            AggregateKind::Map => {
                let mut pairs = Vec::with_capacity(children.len() / 2);
                let mut iter = children.into_iter();
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    pairs.push((key, value));
                }
                Value::Map(pairs)
            }
        }
    }
}

/// An in-progress composite
#[derive(Debug)]
struct Frame {
    kind: AggregateKind,

    /// Children needed to complete (two per map entry)
    expected: usize,

    children: Vec<Value>,
}

/// Result of looking at the unread bytes
enum Token {
    /// A complete value and the bytes it used
    Value(Value, usize),

    /// A complete length-prefixed string, payload still in the buffer
    Bulk {
        lead: u8,
        header: usize,
        len: usize,
    },

    /// A composite header with at least one child to come
    Aggregate {
        kind: AggregateKind,
        expected: usize,
        used: usize,
    },
}

/// Incremental reply parser
#[derive(Debug)]
pub struct Parser {
    version: ProtocolVersion,
    options: ParseOptions,

    /// Composites being filled, outermost first
    stack: Vec<Frame>,

    /// Set once the stream desyncs; repeated on every later call
    failed: Option<ProtocolError>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(ProtocolVersion::default(), ParseOptions::default())
    }
}

impl Parser {
    pub fn new(version: ProtocolVersion, options: ParseOptions) -> Self {
        Self {
            version,
            options,
            stack: Vec::new(),
            failed: None,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Change the accepted protocol version (e.g. after a `HELLO 3`)
    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version;
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Current nesting depth of the partially parsed reply
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether no reply is partially parsed
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    /// The error that poisoned this parser, if any
    pub fn error(&self) -> Option<&ProtocolError> {
        self.failed.as_ref()
    }

    /// Forget all partial state and any previous error
    pub fn reset(&mut self) {
        self.stack.clear();
        self.failed = None;
    }

    /// Parse the next complete reply from `buf`
    ///
    /// Returns `Ok(None)` when more bytes are needed; whatever was consumed
    /// so far is remembered and parsing resumes on the next call.
    pub fn parse(&mut self, buf: &mut Buffer) -> Result<Option<Value>, ProtocolError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        match self.parse_inner(buf) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::debug!(
                    "Reply parser desynced at depth {}: {}",
                    self.stack.len(),
                    err
                );
                self.failed = Some(err.clone());
                Err(err)
            }
        }
    }

    fn parse_inner(&mut self, buf: &mut Buffer) -> Result<Option<Value>, ProtocolError> {
        loop {
            let token = match self.next_token(buf.unread())? {
                Some(token) => token,
                None => return Ok(None),
            };

            match token {
                Token::Value(value, used) => {
                    buf.consume(used);
                    if let Some(done) = self.complete(value) {
                        return Ok(Some(done));
                    }
                }
                Token::Bulk { lead, header, len } => {
                    buf.consume(header);
                    let payload = buf.split_unread(len);
                    buf.consume(2);
                    if let Some(done) = self.complete(bulk_value(lead, payload)) {
                        return Ok(Some(done));
                    }
                }
                Token::Aggregate {
                    kind,
                    expected,
                    used,
                } => {
                    buf.consume(used);
                    tracing::trace!(
                        "Composite {:?} of {} children at depth {}",
                        kind,
                        expected,
                        self.stack.len() + 1
                    );
                    self.stack.push(Frame {
                        kind,
                        expected,
                        children: Vec::with_capacity(expected.min(PREALLOC_LIMIT)),
                    });
                }
            }
        }
    }

    /// Attach a finished value to the open frames, closing every frame it
    /// fills. Returns the top-level reply once the stack empties.
    fn complete(&mut self, mut value: Value) -> Option<Value> {
        while let Some(mut frame) = self.stack.pop() {
            frame.children.push(value);
            if frame.children.len() < frame.expected {
                self.stack.push(frame);
                return None;
            }
            value = frame.kind.build(frame.children);
        }
        Some(value)
    }

    fn next_token(&self, data: &[u8]) -> Result<Option<Token>, ProtocolError> {
        let lead = match data.first() {
            Some(&b) => b,
            None => return Ok(None),
        };
        let resp3 = self.version == ProtocolVersion::Resp3;

        match lead {
            b'+' => self.scalar(data, |line| Ok(Value::Status(Bytes::copy_from_slice(line)))),
            b'-' => self.scalar(data, |line| Ok(Value::Error(Bytes::copy_from_slice(line)))),
            b':' => self.scalar(data, |line| {
                parse_i64(line)
                    .map(Value::Integer)
                    .ok_or_else(|| ProtocolError::InvalidInteger(lossy(line)))
            }),
            b'$' => self.bulk(data),
            b'*' => self.aggregate(data, AggregateKind::Array),

            b'_' if resp3 => self.scalar(data, |line| {
                if line.is_empty() {
                    Ok(Value::Null)
                } else {
                    Err(ProtocolError::Malformed("null reply with payload"))
                }
            }),
            b',' if resp3 => self.scalar(data, |line| {
                std::str::from_utf8(line)
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok())
                    .map(Value::Double)
                    .ok_or_else(|| ProtocolError::InvalidDouble(lossy(line)))
            }),
            b'#' if resp3 => self.scalar(data, |line| match line {
                b"t" => Ok(Value::Boolean(true)),
                b"f" => Ok(Value::Boolean(false)),
                _ => Err(ProtocolError::InvalidBoolean),
            }),
            b'(' if resp3 => self.scalar(data, |line| {
                if is_big_number(line) {
                    Ok(Value::BigNumber(Bytes::copy_from_slice(line)))
                } else {
                    Err(ProtocolError::InvalidBigNumber(lossy(line)))
                }
            }),
            b'=' | b'!' if resp3 => self.bulk(data),
            b'%' if resp3 => self.aggregate(data, AggregateKind::Map),
            b'~' if resp3 => self.aggregate(data, AggregateKind::Set),
            b'>' if resp3 => self.aggregate(data, AggregateKind::Push),

            other => Err(ProtocolError::InvalidPrefix(other)),
        }
    }

    /// Find the line after the lead byte.
    ///
    /// Returns the line contents and the bytes used including lead and CRLF.
    fn line<'a>(&self, data: &'a [u8]) -> Result<Option<(&'a [u8], usize)>, ProtocolError> {
        match find_crlf(&data[1..]) {
            Some(end) => Ok(Some((&data[1..1 + end], end + 3))),
            None if data.len() > self.options.max_inline_len => Err(ProtocolError::LineTooLong {
                len: data.len(),
                max: self.options.max_inline_len,
            }),
            None => Ok(None),
        }
    }

    fn scalar<F>(&self, data: &[u8], build: F) -> Result<Option<Token>, ProtocolError>
    where
        F: FnOnce(&[u8]) -> Result<Value, ProtocolError>,
    {
        match self.line(data)? {
            Some((line, used)) => Ok(Some(Token::Value(build(line)?, used))),
            None => Ok(None),
        }
    }

    /// `$`, `=` and `!`: length line, payload, CRLF
    fn bulk(&self, data: &[u8]) -> Result<Option<Token>, ProtocolError> {
        let (header, used) = match self.line(data)? {
            Some(found) => found,
            None => return Ok(None),
        };

        let len = match parse_length(header)? {
            Some(len) => len,
            None => return Ok(Some(Token::Value(Value::Null, used))),
        };
        if len > self.options.max_bulk_len {
            return Err(ProtocolError::BulkStringTooLong {
                len,
                max: self.options.max_bulk_len,
            });
        }

        let end = match used.checked_add(len) {
            Some(end) if end <= usize::MAX - 2 => end,
            _ => {
                return Err(ProtocolError::BulkStringTooLong {
                    len,
                    max: self.options.max_bulk_len,
                })
            }
        };
        if data.len() < end + 2 {
            return Ok(None);
        }
        if &data[end..end + 2] != b"\r\n" {
            return Err(ProtocolError::Malformed("missing CRLF after bulk payload"));
        }

        let payload = &data[used..end];
        if data[0] == b'=' && (payload.len() < 4 || payload[3] != b':') {
            return Err(ProtocolError::InvalidVerbatimFormat);
        }

        Ok(Some(Token::Bulk {
            lead: data[0],
            header: used,
            len,
        }))
    }

    /// `*`, `%`, `~` and `>`: count line, then children
    fn aggregate(&self, data: &[u8], kind: AggregateKind) -> Result<Option<Token>, ProtocolError> {
        let (header, used) = match self.line(data)? {
            Some(found) => found,
            None => return Ok(None),
        };

        let count = match parse_length(header)? {
            Some(count) => count,
            None => return Ok(Some(Token::Value(Value::Null, used))),
        };
        if count > self.options.max_elements {
            return Err(ProtocolError::CollectionTooLarge {
                len: count,
                max: self.options.max_elements,
            });
        }
        if count == 0 {
            return Ok(Some(Token::Value(kind.build(Vec::new()), used)));
        }

        let depth = self.stack.len() + 1;
        if depth > self.options.max_depth {
            return Err(ProtocolError::NestingTooDeep(depth));
        }

        let expected = match kind {
            AggregateKind::Map => count.checked_mul(2).ok_or(ProtocolError::CollectionTooLarge {
                len: count,
                max: self.options.max_elements,
            })?,
            _ => count,
        };

        Ok(Some(Token::Aggregate {
            kind,
            expected,
            used,
        }))
    }
}

// =============================================================================
// Field helpers
// =============================================================================

/// Build a `$`, `=` or `!` value around a payload taken from the buffer
fn bulk_value(lead: u8, payload: Bytes) -> Value {
    match lead {
        // Format checked before the payload was taken
        b'=' => Value::VerbatimString {
            format: [payload[0], payload[1], payload[2]],
            data: payload.slice(4..),
        },
        b'!' => Value::Error(payload),
        _ => Value::BulkString(payload),
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

/// Strict signed decimal: optional '-', at least one digit, no overflow
fn parse_i64(bytes: &[u8]) -> Option<i64> {
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return None;
    }

    let mut n: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        let d = (b - b'0') as i64;
        n = n.checked_mul(10)?;
        n = if negative {
            n.checked_sub(d)?
        } else {
            n.checked_add(d)?
        };
    }
    Some(n)
}

/// Length or count field. `-1` means null (`None`); anything below is invalid.
fn parse_length(header: &[u8]) -> Result<Option<usize>, ProtocolError> {
    let n = parse_i64(header).ok_or_else(|| ProtocolError::InvalidInteger(lossy(header)))?;
    if n == -1 {
        return Ok(None);
    }
    usize::try_from(n)
        .map(Some)
        .map_err(|_| ProtocolError::InvalidLength(n))
}

fn is_big_number(bytes: &[u8]) -> bool {
    let digits = bytes.strip_prefix(b"-").unwrap_or(bytes);
    !digits.is_empty() && digits.iter().all(u8::is_ascii_digit)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
