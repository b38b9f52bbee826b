//! Configuration for redlink connections
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::{ParseOptions, ProtocolVersion};

/// Where a connection is made to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP host (name or address) and port
    Tcp { host: String, port: u16 },

    /// Unix domain socket path
    Unix(PathBuf),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// TLS settings for a connection
///
/// All paths point to PEM files. The certificate and key are only needed
/// when the server requires client authentication.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Client certificate chain
    pub cert_file: Option<PathBuf>,

    /// Client private key
    pub key_file: Option<PathBuf>,

    /// Trusted CA bundle; the bundled web PKI roots are used when unset
    pub ca_file: Option<PathBuf>,

    /// Name to verify the server certificate against (defaults to the host)
    pub server_name: Option<String>,
}

/// Main configuration for a redlink connection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Target address
    pub endpoint: Endpoint,

    /// Disable Nagle's algorithm on TCP sockets
    pub tcp_nodelay: bool,

    // -------------------------------------------------------------------------
    // Timeout Configuration (0 = no timeout)
    // -------------------------------------------------------------------------
    /// Connect timeout, also bounds the TLS handshake (milliseconds)
    pub connect_timeout_ms: u64,

    /// Reply read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Flush write timeout (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Which reply types the parser accepts
    pub protocol: ProtocolVersion,

    /// Parser resource limits
    pub parse_options: ParseOptions,

    /// Bytes requested from the transport per read
    pub read_chunk_size: usize,

    // -------------------------------------------------------------------------
    // TLS Configuration
    // -------------------------------------------------------------------------
    /// When set, the connection performs a TLS handshake after connecting
    pub tls: Option<TlsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Tcp {
                host: "127.0.0.1".to_string(),
                port: 6379,
            },
            tcp_nodelay: true,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            protocol: ProtocolVersion::Resp2,
            parse_options: ParseOptions::default(),
            read_chunk_size: 16 * 1024, // 16 KB
            tls: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Connect timeout as a Duration (None = wait forever)
    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    /// Read timeout as a Duration (None = wait forever)
    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    /// Write timeout as a Duration (None = wait forever)
    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    /// Host name used for TLS verification, if any
    pub fn server_name(&self) -> Option<&str> {
        if let Some(name) = self.tls.as_ref().and_then(|t| t.server_name.as_deref()) {
            return Some(name);
        }
        match &self.endpoint {
            Endpoint::Tcp { host, .. } => Some(host),
            Endpoint::Unix(_) => None,
        }
    }
}

fn millis(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Connect over TCP to host:port
    pub fn tcp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.endpoint = Endpoint::Tcp {
            host: host.into(),
            port,
        };
        self
    }

    /// Connect to a Unix domain socket
    pub fn unix(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.endpoint = Endpoint::Unix(path.into());
        self
    }

    /// Set TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.config.tcp_nodelay = enabled;
        self
    }

    /// Set the connect timeout (in milliseconds, 0 = none)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds, 0 = none)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds, 0 = none)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Select the protocol version the parser accepts
    pub fn protocol(mut self, version: ProtocolVersion) -> Self {
        self.config.protocol = version;
        self
    }

    /// Set the parser limits
    pub fn parse_options(mut self, options: ParseOptions) -> Self {
        self.config.parse_options = options;
        self
    }

    /// Set the per-read chunk size (in bytes)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size.max(1);
        self
    }

    /// Enable TLS with the given settings
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.config.tls = Some(tls);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
