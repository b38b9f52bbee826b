//! Client Connection
//!
//! Owns one transport, the outbound buffer, the inbound reply reader and the
//! count of replies still owed by the server.
//!
//! ## State Machine
//! ```text
//!  Unconnected ──connect──▶ Connecting ──ok──▶ Ready ──close──▶ Closed
//!                               │                │
//!                               └──err──▶ Errored ◀──transport/protocol failure
//!                                           │
//!                                           └──close──▶ Closed
//! ```
//! Timeouts do not leave `Ready`: buffered bytes and parser state survive,
//! so the same call can be retried. There is no implicit reconnect.
//!
//! ## Reply Matching
//! Replies carry no request id. The n-th reply read belongs to the n-th
//! command enqueued, so the only matching rule is FIFO order. RESP3 push
//! messages answer no command: they go to the push handler, or to a bounded
//! queue drained with [`Connection::take_push`], and never consume a reply.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use crate::buffer::Buffer;
use crate::config::Config;
use crate::error::{RedlinkError, Result};
use crate::protocol::{encode_command, Command, ProtocolVersion, ReplyReader, Value};

#[cfg(feature = "tls")]
use super::tls::TlsContext;
use super::transport::{self, is_timeout, Transport};

/// Lifecycle state of a [`Connection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Ready,
    Errored,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Unconnected => "unconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Errored => "errored",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// What was discarded when a connection closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseSummary {
    /// Commands sent (or queued) whose replies were never delivered
    pub pending_replies: usize,

    /// Encoded bytes never written to the transport
    pub unflushed_bytes: usize,

    /// Received bytes never turned into a reply
    pub unparsed_bytes: usize,
}

impl CloseSummary {
    /// Whether nothing was left behind
    pub fn is_clean(&self) -> bool {
        self.pending_replies == 0 && self.unflushed_bytes == 0 && self.unparsed_bytes == 0
    }
}

/// Receives RESP3 push messages out of band
pub type PushHandler = Box<dyn FnMut(Value) + Send>;

/// Push messages kept without a handler; the oldest is dropped beyond this
pub const MAX_QUEUED_PUSHES: usize = 1024;

/// A client connection
pub struct Connection {
    config: Config,
    state: ConnectionState,

    transport: Option<Box<dyn Transport>>,

    /// Encoded commands not yet written
    outbound: Buffer,

    /// Received bytes plus parser state
    inbound: ReplyReader,

    /// Scratch space for one transport read
    scratch: Vec<u8>,

    /// Replies owed by the server, in command order
    pending: usize,

    push_handler: Option<PushHandler>,

    /// Push messages received while no handler was installed
    pushes: VecDeque<Value>,

    #[cfg(feature = "tls")]
    tls_context: Option<TlsContext>,

    /// Cause of the last fatal failure
    last_error: Option<String>,

    /// Peer address for logging
    peer: String,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("outbound", &self.outbound.len())
            .field("inbound", &self.inbound.buffered())
            .finish()
    }
}

impl Connection {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create an unconnected connection
    pub fn new(config: Config) -> Self {
        let inbound = ReplyReader::new(config.protocol, config.parse_options);
        let scratch = vec![0u8; config.read_chunk_size.max(1)];
        let peer = config.endpoint.to_string();

        Self {
            config,
            state: ConnectionState::Unconnected,
            transport: None,
            outbound: Buffer::new(),
            inbound,
            scratch,
            pending: 0,
            push_handler: None,
            pushes: VecDeque::new(),
            #[cfg(feature = "tls")]
            tls_context: None,
            last_error: None,
            peer,
        }
    }

    /// Create and connect
    pub fn open(config: Config) -> Result<Self> {
        let mut conn = Self::new(config);
        conn.connect()?;
        Ok(conn)
    }

    /// Wrap an already connected transport; the connection starts `Ready`
    pub fn with_transport(config: Config, transport: Box<dyn Transport>) -> Self {
        let mut conn = Self::new(config);
        conn.peer = transport.peer_addr();
        conn.transport = Some(transport);
        conn.state = ConnectionState::Ready;
        conn
    }

    /// Speak TLS using a prebuilt context instead of loading one from the
    /// config's PEM files
    #[cfg(feature = "tls")]
    pub fn with_tls_context(mut self, context: TlsContext) -> Self {
        self.tls_context = Some(context);
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connect the transport (and run the TLS handshake if configured)
    ///
    /// Valid from `Unconnected`, `Errored` and `Closed`. On failure the
    /// connection is `Errored` and never became `Ready`.
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Unconnected | ConnectionState::Errored | ConnectionState::Closed => {}
            state => {
                return Err(RedlinkError::InvalidState {
                    op: "connect",
                    state,
                })
            }
        }

        if let Some(mut old) = self.transport.take() {
            let _ = old.shutdown();
        }
        self.reset_session();
        self.state = ConnectionState::Connecting;
        tracing::debug!("Connecting to {}", self.config.endpoint);

        match self.open_transport() {
            Ok(transport) => {
                self.peer = transport.peer_addr();
                tracing::debug!(
                    "Connected to {} (encrypted: {})",
                    self.peer,
                    transport.is_encrypted()
                );
                self.transport = Some(transport);
                self.state = ConnectionState::Ready;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", self.config.endpoint, e);
                self.state = ConnectionState::Errored;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    #[cfg(feature = "tls")]
    fn open_transport(&mut self) -> Result<Box<dyn Transport>> {
        if self.tls_context.is_none() {
            if let Some(tls) = &self.config.tls {
                self.tls_context = Some(TlsContext::from_config(tls)?);
            }
        }
        transport::open(&self.config, self.tls_context.as_ref())
    }

    #[cfg(not(feature = "tls"))]
    fn open_transport(&mut self) -> Result<Box<dyn Transport>> {
        transport::open(&self.config)
    }

    /// Close and connect again with the same configuration
    pub fn reconnect(&mut self) -> Result<()> {
        let summary = self.close();
        if !summary.is_clean() {
            tracing::debug!("Reconnecting to {} dropped {:?}", self.config.endpoint, summary);
        }
        self.connect()
    }

    /// Close the connection from any state
    ///
    /// Releases the transport and reports what was left undelivered.
    pub fn close(&mut self) -> CloseSummary {
        let summary = CloseSummary {
            pending_replies: self.pending,
            unflushed_bytes: self.outbound.len(),
            unparsed_bytes: self.inbound.buffered(),
        };

        let had_transport = self.transport.is_some();
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.shutdown() {
                tracing::debug!("Error shutting down transport to {}: {}", self.peer, e);
            }
        }

        if had_transport || !summary.is_clean() {
            if summary.is_clean() {
                tracing::debug!("Closed connection to {}", self.peer);
            } else {
                tracing::warn!(
                    "Closed connection to {} with {} replies pending ({} bytes unflushed, {} bytes unparsed)",
                    self.peer,
                    summary.pending_replies,
                    summary.unflushed_bytes,
                    summary.unparsed_bytes
                );
            }
        }

        self.state = ConnectionState::Closed;
        self.reset_session();
        summary
    }

    // =========================================================================
    // Pipelining
    // =========================================================================

    /// Encode a command into the outbound buffer
    ///
    /// Never touches the network; call [`flush`](Self::flush) to send.
    pub fn enqueue(&mut self, command: &Command) -> Result<()> {
        self.ensure_ready("enqueue")?;
        command.encode(&mut self.outbound)?;
        self.pending += 1;
        tracing::trace!(
            "Enqueued {} args for {} ({} pending)",
            command.len(),
            self.peer,
            self.pending
        );
        Ok(())
    }

    /// Encode a raw argument vector into the outbound buffer
    pub fn enqueue_argv<A: AsRef<[u8]>>(&mut self, argv: &[A]) -> Result<()> {
        self.ensure_ready("enqueue")?;
        encode_command(argv, &mut self.outbound)?;
        self.pending += 1;
        Ok(())
    }

    /// Write every buffered command to the transport
    ///
    /// Short writes are retried. On a write timeout the unwritten bytes stay
    /// buffered and the connection stays `Ready`.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_ready("flush")?;
        let result = self.write_outbound();
        self.settle(result)
    }

    fn write_outbound(&mut self) -> Result<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(RedlinkError::ConnectionClosed)?;
        transport.set_write_timeout(self.config.write_timeout())?;

        while !self.outbound.is_empty() {
            match transport.write(self.outbound.unread()) {
                Ok(0) => {
                    return Err(RedlinkError::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "transport accepted no bytes",
                    )))
                }
                Ok(n) => self.outbound.consume(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(RedlinkError::Timeout("write")),
                Err(e) => return Err(e.into()),
            }
        }

        match transport.flush() {
            Ok(()) => Ok(()),
            Err(e) if is_timeout(&e) => Err(RedlinkError::Timeout("write")),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the earliest outstanding reply, using the configured read timeout
    pub fn read_reply(&mut self) -> Result<Value> {
        self.read_reply_timeout(self.config.read_timeout())
    }

    /// Read the earliest outstanding reply within `timeout` (None = block)
    ///
    /// Buffered commands are flushed first. A timeout keeps all partially
    /// received bytes, so calling again resumes where this call stopped.
    pub fn read_reply_timeout(&mut self, timeout: Option<Duration>) -> Result<Value> {
        self.ensure_ready("read reply")?;
        if self.pending == 0 {
            return Err(RedlinkError::NoPendingReplies);
        }
        if !self.outbound.is_empty() {
            self.flush()?;
        }

        // A deadline past what Instant can hold means no deadline
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let result = self.read_until_reply(deadline);
        self.settle(result)
    }

    fn read_until_reply(&mut self, deadline: Option<Instant>) -> Result<Value> {
        loop {
            while let Some(reply) = self.inbound.next_reply()? {
                if let Some(reply) = self.route(reply) {
                    self.pending -= 1;
                    tracing::trace!(
                        "Reply ({}) from {} ({} pending)",
                        reply.type_name(),
                        self.peer,
                        self.pending
                    );
                    return Ok(reply);
                }
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(RedlinkError::Timeout("read"));
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            let transport = self
                .transport
                .as_mut()
                .ok_or(RedlinkError::ConnectionClosed)?;
            transport.set_read_timeout(remaining)?;

            match transport.read(&mut self.scratch) {
                Ok(0) => return Err(RedlinkError::ConnectionClosed),
                Ok(n) => self.inbound.feed(&self.scratch[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(RedlinkError::Timeout("read")),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(RedlinkError::ConnectionClosed)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Take push messages out of the reply stream
    fn route(&mut self, reply: Value) -> Option<Value> {
        if !matches!(reply, Value::Push(_)) {
            return Some(reply);
        }

        match &mut self.push_handler {
            Some(handler) => {
                tracing::trace!("Push message from {} routed to handler", self.peer);
                handler(reply);
            }
            None => {
                if self.pushes.len() == MAX_QUEUED_PUSHES {
                    self.pushes.pop_front();
                    tracing::debug!("Push queue for {} full, dropped the oldest", self.peer);
                }
                tracing::trace!("Push message from {} queued", self.peer);
                self.pushes.push_back(reply);
            }
        }
        None
    }

    // =========================================================================
    // Synchronous Commands
    // =========================================================================

    /// Send one command and wait for its reply
    ///
    /// Rejected while pipelined replies are outstanding, since the next reply
    /// on the wire would belong to an earlier command.
    pub fn command(&mut self, command: &Command) -> Result<Value> {
        self.ensure_idle("command")?;
        self.enqueue(command)?;
        self.flush()?;
        self.read_reply()
    }

    /// Send one raw argument vector and wait for its reply
    pub fn command_argv<A: AsRef<[u8]>>(&mut self, argv: &[A]) -> Result<Value> {
        self.ensure_idle("command")?;
        self.enqueue_argv(argv)?;
        self.flush()?;
        self.read_reply()
    }

    // =========================================================================
    // Settings and Accessors
    // =========================================================================

    /// Install a handler for RESP3 push messages
    ///
    /// Without a handler, push messages are queued for [`take_push`](Self::take_push).
    /// Messages already queued are handed to the new handler first.
    pub fn set_push_handler<F>(&mut self, handler: F)
    where
        F: FnMut(Value) + Send + 'static,
    {
        let mut handler: PushHandler = Box::new(handler);
        for push in self.pushes.drain(..) {
            handler(push);
        }
        self.push_handler = Some(handler);
    }

    pub fn clear_push_handler(&mut self) {
        self.push_handler = None;
    }

    /// Oldest push message received while no handler was installed
    pub fn take_push(&mut self) -> Option<Value> {
        self.pushes.pop_front()
    }

    pub fn queued_pushes(&self) -> usize {
        self.pushes.len()
    }

    /// Change the accepted reply types, e.g. after the server agreed to RESP3
    pub fn set_protocol(&mut self, version: ProtocolVersion) {
        self.config.protocol = version;
        self.inbound.set_version(version);
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.config.read_timeout_ms = to_millis(timeout);
    }

    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) {
        self.config.write_timeout_ms = to_millis(timeout);
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Replies owed by the server
    pub fn pending_replies(&self) -> usize {
        self.pending
    }

    /// Cause of the most recent fatal failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_encrypted(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_encrypted())
    }

    /// Received bytes not yet turned into a reply
    pub fn buffered_bytes(&self) -> usize {
        self.inbound.buffered()
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn ensure_ready(&self, op: &'static str) -> Result<()> {
        if self.state == ConnectionState::Ready {
            Ok(())
        } else {
            Err(RedlinkError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    fn ensure_idle(&self, op: &'static str) -> Result<()> {
        self.ensure_ready(op)?;
        if self.pending > 0 {
            return Err(RedlinkError::PipelineBusy {
                pending: self.pending,
            });
        }
        Ok(())
    }

    /// Move to `Errored` on fatal failures; pass the result through
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                tracing::warn!("Connection to {} failed: {}", self.peer, e);
                self.state = ConnectionState::Errored;
                self.last_error = Some(e.to_string());
            } else {
                tracing::debug!("Operation on {} did not complete: {}", self.peer, e);
            }
        }
        result
    }

    fn reset_session(&mut self) {
        self.outbound.clear();
        self.inbound.reset();
        self.pending = 0;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.state != ConnectionState::Closed {
            self.close();
        }
    }
}

fn to_millis(timeout: Option<Duration>) -> u64 {
    match timeout {
        Some(t) => u64::try_from(t.as_millis()).unwrap_or(u64::MAX).max(1),
        None => 0,
    }
}
