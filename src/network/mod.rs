//! Network Module
//!
//! Connections and the transports under them.
//!
//! ## Architecture
//! - `Transport`: byte stream boundary (TCP, Unix socket, TLS over either)
//! - `Connection`: buffers, parser and FIFO reply matching over one transport
//! - `Pipeline` / `SharedConnection`: batching and cross-thread use
//!
//! All I/O is driven by the caller; nothing runs in the background.

mod connection;
mod pipeline;
mod shared;
mod tcp;
mod transport;

#[cfg(feature = "tls")]
mod tls;
#[cfg(unix)]
mod unix;

pub use connection::{
    CloseSummary, Connection, ConnectionState, PushHandler, MAX_QUEUED_PUSHES,
};
pub use pipeline::Pipeline;
pub use shared::SharedConnection;
pub use tcp::TcpTransport;
pub use transport::{is_timeout, open, Transport};

#[cfg(feature = "tls")]
pub use tls::{TlsContext, TlsTransport};
#[cfg(unix)]
pub use unix::UnixTransport;
