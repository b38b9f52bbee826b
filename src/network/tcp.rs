//! TCP transport

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{RedlinkError, Result};

use super::transport::{is_timeout, Transport};

/// A plain TCP stream
pub struct TcpTransport {
    stream: TcpStream,

    /// Peer address for logging
    peer: String,
}

impl TcpTransport {
    /// Resolve `host:port` and connect to the first address that accepts
    ///
    /// Each resolved address gets the full `timeout`.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>, nodelay: bool) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let resolved = (host, port)
            .to_socket_addrs()
            .map_err(|source| RedlinkError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut last_err = None;
        for sock_addr in resolved {
            let attempt = match timeout {
                Some(t) => TcpStream::connect_timeout(&sock_addr, t),
                None => TcpStream::connect(sock_addr),
            };
            match attempt {
                Ok(stream) => return Self::from_stream(stream, nodelay).map_err(RedlinkError::Io),
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", sock_addr, e);
                    last_err = Some(e);
                }
            }
        }

        let source = last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no addresses")
        });
        if is_timeout(&source) {
            return Err(RedlinkError::Timeout("connect"));
        }
        Err(RedlinkError::Connect { addr, source })
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream, nodelay: bool) -> io::Result<Self> {
        stream.set_nodelay(nodelay)?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Ok(Self { stream, peer })
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_write_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }

    fn peer_addr(&self) -> String {
        self.peer.clone()
    }
}
