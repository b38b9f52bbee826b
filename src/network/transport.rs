//! Transport abstraction
//!
//! The connection only needs a readable/writable byte stream with
//! timeout-capable I/O and a way to shut it down. TCP, Unix sockets and
//! TLS-over-either all implement [`Transport`].

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::config::{Config, Endpoint};
use crate::error::{RedlinkError, Result};

use super::tcp::TcpTransport;
#[cfg(feature = "tls")]
use super::tls::{TlsContext, TlsTransport};
#[cfg(unix)]
use super::unix::UnixTransport;

/// A connected byte stream
///
/// Reads that hit the configured timeout must fail with
/// `ErrorKind::WouldBlock` or `ErrorKind::TimedOut`, like std sockets do.
pub trait Transport: Read + Write + Send {
    /// Set the timeout for subsequent reads (None = block)
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Set the timeout for subsequent writes (None = block)
    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Shut the stream down in both directions
    fn shutdown(&mut self) -> io::Result<()>;

    /// Peer description for logging
    fn peer_addr(&self) -> String;

    /// Whether bytes are encrypted on the wire
    fn is_encrypted(&self) -> bool {
        false
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_write_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        (**self).shutdown()
    }

    fn peer_addr(&self) -> String {
        (**self).peer_addr()
    }

    fn is_encrypted(&self) -> bool {
        (**self).is_encrypted()
    }
}

/// Whether an I/O error is a timeout
///
/// Unix reports socket timeouts as `WouldBlock`, Windows as `TimedOut`.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Open the configured endpoint, with a TLS handshake on top when configured
#[cfg(feature = "tls")]
pub fn open(config: &Config, tls: Option<&TlsContext>) -> Result<Box<dyn Transport>> {
    let context = match tls {
        None => return open_plain(config),
        Some(context) => context,
    };

    let server_name = config.server_name().ok_or_else(|| {
        RedlinkError::Config("TLS over a unix socket needs tls.server_name".to_string())
    })?;
    let base = open_plain(config)?;
    let stream = TlsTransport::handshake(context, server_name, base, config.connect_timeout())?;
    Ok(Box::new(stream))
}

/// Open the configured endpoint
#[cfg(not(feature = "tls"))]
pub fn open(config: &Config) -> Result<Box<dyn Transport>> {
    if config.tls.is_some() {
        return Err(RedlinkError::Config(
            "TLS requested but built without the `tls` feature".to_string(),
        ));
    }
    open_plain(config)
}

fn open_plain(config: &Config) -> Result<Box<dyn Transport>> {
    match &config.endpoint {
        Endpoint::Tcp { host, port } => Ok(Box::new(TcpTransport::connect(
            host,
            *port,
            config.connect_timeout(),
            config.tcp_nodelay,
        )?)),
        #[cfg(unix)]
        Endpoint::Unix(path) => Ok(Box::new(UnixTransport::connect(path)?)),
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(RedlinkError::Config(
            "unix sockets are not supported on this platform".to_string(),
        )),
    }
}
