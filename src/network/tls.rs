//! TLS transport via rustls
//!
//! Provides:
//! - A reusable client context built once from PEM files
//! - Optional client certificate authentication
//! - One handshake right after connect, then transparent encrypted I/O
//!
//! The TLS layer wraps any other [`Transport`], so TLS works over TCP and
//! Unix sockets alike.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::config::TlsConfig;
use crate::error::{RedlinkError, Result};

use super::transport::{is_timeout, Transport};

/// Shareable client-side TLS settings
///
/// Cheap to clone; build it once and reuse it for every connection.
#[derive(Clone)]
pub struct TlsContext {
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext").finish_non_exhaustive()
    }
}

impl TlsContext {
    /// Build a context from PEM files
    ///
    /// # Errors
    ///
    /// Returns `RedlinkError::Config` if files cannot be read or parsed, or if
    /// only one of certificate / key is given.
    pub fn from_config(tls: &TlsConfig) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        match &tls.ca_file {
            Some(ca_file) => {
                for cert in load_certs(ca_file)? {
                    roots.add(cert).map_err(|e| {
                        RedlinkError::Config(format!(
                            "bad CA certificate in {}: {}",
                            ca_file.display(),
                            e
                        ))
                    })?;
                }
            }
            None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
        }

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| RedlinkError::Tls(e.to_string()))?
            .with_root_certificates(roots);

        let config = match (&tls.cert_file, &tls.key_file) {
            (Some(cert_file), Some(key_file)) => {
                let certs = load_certs(cert_file)?;
                let key = load_private_key(key_file)?;
                builder
                    .with_client_auth_cert(certs, key)
                    .map_err(|e| RedlinkError::Config(format!("client certificate rejected: {}", e)))?
            }
            (None, None) => builder.with_no_client_auth(),
            _ => {
                return Err(RedlinkError::Config(
                    "cert_file and key_file must be given together".to_string(),
                ))
            }
        };

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Wrap an existing rustls client configuration
    pub fn from_client_config(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    pub fn client_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.config)
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| RedlinkError::Config(format!("cannot open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| RedlinkError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
    if certs.is_empty() {
        return Err(RedlinkError::Config(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| RedlinkError::Config(format!("cannot open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| RedlinkError::Config(format!("failed to parse {}: {}", path.display(), e)))?
        .ok_or_else(|| {
            RedlinkError::Config(format!("no private key found in {}", path.display()))
        })
}

/// An encrypted stream over another transport
pub struct TlsTransport {
    stream: StreamOwned<ClientConnection, Box<dyn Transport>>,
    peer: String,
}

impl TlsTransport {
    /// Run the handshake over `inner`, bounded as a whole by `timeout`
    pub fn handshake(
        context: &TlsContext,
        server_name: &str,
        mut inner: Box<dyn Transport>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let name = ServerName::try_from(server_name.to_string()).map_err(|e| {
            RedlinkError::Config(format!("invalid TLS server name {}: {}", server_name, e))
        })?;
        let mut conn = ClientConnection::new(context.client_config(), name)
            .map_err(|e| RedlinkError::Tls(e.to_string()))?;

        let peer = inner.peer_addr();
        tracing::debug!("Starting TLS handshake with {} as {}", peer, server_name);

        // A deadline past what Instant can hold means no deadline
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        while conn.is_handshaking() || conn.wants_write() {
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(RedlinkError::Timeout("tls handshake"));
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            inner.set_read_timeout(remaining)?;
            inner.set_write_timeout(remaining)?;

            match handshake_step(&mut conn, &mut inner) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_timeout(&e) => return Err(RedlinkError::Timeout("tls handshake")),
                Err(e) => {
                    return Err(RedlinkError::Tls(format!(
                        "handshake with {} failed: {}",
                        peer, e
                    )))
                }
            }
        }

        tracing::debug!(
            "TLS established with {} ({:?})",
            peer,
            conn.protocol_version()
        );

        Ok(Self {
            stream: StreamOwned::new(conn, inner),
            peer,
        })
    }
}

/// One write or one read of handshake records
fn handshake_step<T: Read + Write>(conn: &mut ClientConnection, inner: &mut T) -> io::Result<()> {
    if conn.wants_write() {
        conn.write_tls(inner)?;
        return Ok(());
    }

    if conn.read_tls(inner)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "peer closed during handshake",
        ));
    }
    if let Err(e) = conn.process_new_packets() {
        // Let the peer see the alert before giving up
        let _ = conn.write_tls(inner);
        return Err(io::Error::new(io::ErrorKind::InvalidData, e));
    }
    Ok(())
}

impl Read for TlsTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TlsTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TlsTransport {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.sock.set_read_timeout(timeout)
    }

    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.sock.set_write_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.stream.conn.send_close_notify();
        while self.stream.conn.wants_write() {
            if self.stream.conn.write_tls(&mut self.stream.sock).is_err() {
                break;
            }
        }
        self.stream.sock.shutdown()
    }

    fn peer_addr(&self) -> String {
        self.peer.clone()
    }

    fn is_encrypted(&self) -> bool {
        true
    }
}
