//! # redlink
//!
//! A RESP client core with:
//! - Binary-safe command encoding
//! - An incremental, non-recursive reply parser (RESP2 and RESP3)
//! - Pipelining with strict FIFO reply matching
//! - Plain TCP, Unix socket and TLS transports behind one interface
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                                │
//! │          command / enqueue + flush / read_reply              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Connection                               │
//! │            (pending count, FIFO matching)                    │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │ Encoder → Buffer│                │ Buffer → Parser │
//!   │   (outbound)    │                │    (inbound)    │
//!   └────────┬────────┘                └────────▲────────┘
//!            │                                  │
//!            └──────────────┐    ┌──────────────┘
//!                           ▼    │
//!                   ┌──────────────────┐
//!                   │    Transport     │
//!                   │ (TCP / Unix/ TLS)│
//!                   └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use redlink::{Command, Config, Connection};
//!
//! let config = Config::builder().tcp("127.0.0.1", 6379).build();
//! let mut conn = Connection::open(config)?;
//!
//! let reply = conn.command(&Command::new("SET").arg("foo").arg("hello world"))?;
//! assert!(reply.is_ok());
//!
//! // Pipelined
//! conn.enqueue(&Command::new("INCR").arg("counter"))?;
//! conn.enqueue(&Command::new("INCR").arg("counter"))?;
//! conn.flush()?;
//! let first = conn.read_reply()?;
//! let second = conn.read_reply()?;
//! # let _ = (first, second);
//! # Ok::<(), redlink::RedlinkError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod buffer;
pub mod config;
pub mod error;

pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use buffer::Buffer;
pub use config::{Config, Endpoint, TlsConfig};
pub use error::{ErrorKind, ProtocolError, RedlinkError, Result};
pub use network::{CloseSummary, Connection, ConnectionState, Pipeline, SharedConnection};
pub use protocol::{Command, ParseOptions, ProtocolVersion, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of redlink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
