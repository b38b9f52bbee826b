//! Error types for redlink
//!
//! Provides a unified error type for all client operations, plus the
//! parser's own `ProtocolError`.
//!
//! ## Classification
//! Every error belongs to exactly one [`ErrorKind`]:
//! - `Transport`: connect refused, reset, TLS failure (connection is dead)
//! - `Timeout`: a deadline elapsed (connection is still usable)
//! - `ProtocolDesync`: the byte stream can no longer be trusted (connection is dead)
//! - `Usage`: the caller asked for something invalid (connection is unaffected)
//!
//! An error reply sent by the server is *not* an error here: it is parsed
//! successfully into `Value::Error`.

use thiserror::Error;

use crate::network::ConnectionState;

/// Result type alias using RedlinkError
pub type Result<T> = std::result::Result<T, RedlinkError>;

/// Unified error type for redlink operations
#[derive(Debug, Error)]
pub enum RedlinkError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("TLS error: {0}")]
    Tls(String),

    // -------------------------------------------------------------------------
    // Timeout Errors
    // -------------------------------------------------------------------------
    #[error("Timed out during {0}")]
    Timeout(&'static str),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol desync: {0}")]
    Protocol(#[from] ProtocolError),

    // -------------------------------------------------------------------------
    // Usage Errors
    // -------------------------------------------------------------------------
    #[error("Command must have at least one argument")]
    EmptyCommand,

    #[error("Cannot {op} while connection is {state}")]
    InvalidState {
        op: &'static str,
        state: ConnectionState,
    },

    #[error("No replies are pending")]
    NoPendingReplies,

    #[error("{pending} pipelined replies must be read before a synchronous command")]
    PipelineBusy { pending: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`RedlinkError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Timeout,
    ProtocolDesync,
    Usage,
}

impl RedlinkError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedlinkError::Io(_)
            | RedlinkError::Connect { .. }
            | RedlinkError::ConnectionClosed
            | RedlinkError::Tls(_) => ErrorKind::Transport,
            RedlinkError::Timeout(_) => ErrorKind::Timeout,
            RedlinkError::Protocol(_) => ErrorKind::ProtocolDesync,
            RedlinkError::EmptyCommand
            | RedlinkError::InvalidState { .. }
            | RedlinkError::NoPendingReplies
            | RedlinkError::PipelineBusy { .. }
            | RedlinkError::Config(_) => ErrorKind::Usage,
        }
    }

    /// Whether this error invalidates the connection it came from
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::ProtocolDesync)
    }

    /// Whether this error is a timeout
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

/// Errors raised by the reply parser.
///
/// All of these mean the inbound stream is out of sync and must be abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Unrecognized (or not negotiated) type lead byte
    #[error("invalid prefix byte: {0:#04x}")]
    InvalidPrefix(u8),

    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Declared length or count is malformed (e.g. below -1)
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    #[error("bulk string too long: {len} bytes exceeds {max} byte limit")]
    BulkStringTooLong { len: usize, max: usize },

    #[error("collection too large: {len} elements exceeds {max} limit")]
    CollectionTooLarge { len: usize, max: usize },

    #[error("nesting too deep: depth {0} exceeds limit")]
    NestingTooDeep(usize),

    #[error("line too long: {len} bytes without terminator exceeds {max}")]
    LineTooLong { len: usize, max: usize },

    #[error("invalid double: {0}")]
    InvalidDouble(String),

    #[error("invalid boolean: expected 't' or 'f'")]
    InvalidBoolean,

    #[error("invalid big number: {0}")]
    InvalidBigNumber(String),

    #[error("invalid verbatim string format")]
    InvalidVerbatimFormat,

    /// Missing CRLF after a payload, or a non-empty null line
    #[error("malformed frame: {0}")]
    Malformed(&'static str),
}
