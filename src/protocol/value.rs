//! Reply value definitions
//!
//! Represents replies parsed from the server.
//!
//! RESP2 types:
//! - Status: `+OK\r\n`
//! - Error: `-ERR message\r\n`
//! - Integer: `:1000\r\n`
//! - Bulk string: `$6\r\nfoobar\r\n`
//! - Array: `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`
//! - Null: `$-1\r\n` or `*-1\r\n`
//!
//! RESP3 adds:
//! - Null: `_\r\n`
//! - Double: `,3.14\r\n`
//! - Boolean: `#t\r\n`
//! - Big number: `(3492890328409238509324850943850943825024385\r\n`
//! - Verbatim string: `=15\r\ntxt:Some string\r\n`
//! - Bulk error: `!21\r\nSYNTAX invalid syntax\r\n` (parsed as `Error`)
//! - Map: `%2\r\n<key><value><key><value>`
//! - Set: `~2\r\n<elem><elem>`
//! - Push: `>2\r\n<elem><elem>`

use bytes::Bytes;

/// A parsed reply
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Status reply: `+OK\r\n`
    Status(Bytes),

    /// Error reply sent by the server: `-ERR message\r\n`
    ///
    /// This is ordinary output, not a client failure.
    Error(Bytes),

    /// Integer: `:1000\r\n`
    Integer(i64),

    /// Binary-safe string: `$6\r\nfoobar\r\n`
    BulkString(Bytes),

    /// Array: `*2\r\n...`
    Array(Vec<Value>),

    /// Null bulk string, null array, or RESP3 null
    Null,

    // ========================================================================
    // RESP3 Types
    // ========================================================================
    /// Double: `,3.14\r\n`
    Double(f64),

    /// Boolean: `#t\r\n` / `#f\r\n`
    Boolean(bool),

    /// Big number kept as its decimal text
    BigNumber(Bytes),

    /// Verbatim string with a 3-byte format tag (e.g. `txt`, `mkd`)
    VerbatimString { format: [u8; 3], data: Bytes },

    /// Map: ordered key/value pairs
    Map(Vec<(Value, Value)>),

    /// Set: ordered elements
    Set(Vec<Value>),

    /// Out-of-band push message
    Push(Vec<Value>),
}

impl Value {
    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn status(s: impl AsRef<[u8]>) -> Self {
        Value::Status(Bytes::copy_from_slice(s.as_ref()))
    }

    pub fn error(msg: impl AsRef<[u8]>) -> Self {
        Value::Error(Bytes::copy_from_slice(msg.as_ref()))
    }

    pub fn bulk(data: impl AsRef<[u8]>) -> Self {
        Value::BulkString(Bytes::copy_from_slice(data.as_ref()))
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Short name of the reply type
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Status(_) => "status",
            Value::Error(_) => "error",
            Value::Integer(_) => "integer",
            Value::BulkString(_) => "string",
            Value::Array(_) => "array",
            Value::Null => "null",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::BigNumber(_) => "bignum",
            Value::VerbatimString { .. } => "verbatim",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Push(_) => "push",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_push(&self) -> bool {
        matches!(self, Value::Push(_))
    }

    /// Whether this is a composite (array, map, set or push)
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Value::Array(_) | Value::Map(_) | Value::Set(_) | Value::Push(_)
        )
    }

    /// Payload of any string-like reply
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Status(b)
            | Value::Error(b)
            | Value::BulkString(b)
            | Value::BigNumber(b)
            | Value::VerbatimString { data: b, .. } => Some(b),
            _ => None,
        }
    }

    /// Payload of a string-like reply, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Elements of an array, set or push
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::Set(items) | Value::Push(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Error message if this is a server error reply
    pub fn as_error(&self) -> Option<&[u8]> {
        match self {
            Value::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Whether this is the `+OK` status
    pub fn is_ok(&self) -> bool {
        matches!(self, Value::Status(s) if s.as_ref() == b"OK")
    }
}
