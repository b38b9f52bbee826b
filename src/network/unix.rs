//! Unix domain socket transport
//!
//! std offers no connect timeout for Unix sockets; a local connect either
//! succeeds or fails immediately.

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use crate::error::{RedlinkError, Result};

use super::transport::Transport;

/// A Unix domain socket stream
pub struct UnixTransport {
    stream: UnixStream,
    path: String,
}

impl UnixTransport {
    pub fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).map_err(|source| RedlinkError::Connect {
            addr: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_stream(stream, path.display().to_string()))
    }

    pub fn from_stream(stream: UnixStream, path: String) -> Self {
        Self { stream, path }
    }
}

impl Read for UnixTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for UnixTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for UnixTransport {
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
        format!("unix:{}", self.path)
    }
}
