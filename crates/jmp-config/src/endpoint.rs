//! The address jmpd listens on, written as `unix:///path` or `tcp://host:port`.

use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Host, Url};

const UNIX_SCHEME: &str = "unix";
const TCP_SCHEME: &str = "tcp";

/// Listening endpoint of the daemon.
///
/// In TOML the endpoint is a table tagged by `transport`; on the command line
/// and in `JMP_DAEMON_SOCKET` it is written as a URL.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket at `path`.
    Unix { path: Utf8PathBuf },
    /// TCP socket on `host:port`. Port 0 asks the OS for a free port.
    Tcp { host: String, port: u16 },
}

impl SocketEndpoint {
    /// Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// TCP endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Socket file path, for Unix endpoints only.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path),
            Self::Tcp { .. } => None,
        }
    }

    /// Creates the directory that will hold the socket file, readable by the
    /// owner only. TCP endpoints need nothing.
    ///
    /// # Errors
    ///
    /// Fails when the socket path has no parent or the parent cannot be
    /// created as a directory.
    pub fn prepare_filesystem(&self) -> Result<(), EndpointPreparationError> {
        self.unix_path().map_or(Ok(()), create_socket_directory)
    }
}

fn create_socket_directory(socket: &Utf8Path) -> Result<(), EndpointPreparationError> {
    let parent = socket
        .parent()
        .ok_or_else(|| EndpointPreparationError::MissingParent {
            path: socket.to_path_buf(),
        })?;
    // A bare file name lives in the working directory.
    if parent.as_str().is_empty() {
        return Ok(());
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(parent)
        .map_err(|source| EndpointPreparationError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "{UNIX_SCHEME}://{path}"),
            Self::Tcp { host, port } if host.contains(':') => {
                write!(formatter, "{TCP_SCHEME}://[{host}]:{port}")
            }
            Self::Tcp { host, port } => write!(formatter, "{TCP_SCHEME}://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input).map_err(|source| EndpointParseError::Malformed {
            input: input.to_owned(),
            source,
        })?;
        match url.scheme() {
            UNIX_SCHEME => unix_from_url(input, &url),
            TCP_SCHEME => tcp_from_url(input, &url),
            scheme => Err(EndpointParseError::UnsupportedScheme {
                input: input.to_owned(),
                scheme: scheme.to_owned(),
            }),
        }
    }
}

fn unix_from_url(input: &str, url: &Url) -> Result<SocketEndpoint, EndpointParseError> {
    if let Some(host) = url.host_str().filter(|host| !host.is_empty()) {
        return Err(EndpointParseError::UnixHost {
            input: input.to_owned(),
            host: host.to_owned(),
        });
    }
    let path = Utf8Path::new(url.path());
    if path.file_name().is_none() {
        return Err(EndpointParseError::MissingUnixPath {
            input: input.to_owned(),
        });
    }
    Ok(SocketEndpoint::unix(path))
}

fn tcp_from_url(input: &str, url: &Url) -> Result<SocketEndpoint, EndpointParseError> {
    // `host_str` keeps the brackets around IPv6 literals, which the resolver
    // rejects.
    let host = match url.host() {
        Some(Host::Domain(name)) if !name.is_empty() => name.to_owned(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => {
            return Err(EndpointParseError::MissingHost {
                input: input.to_owned(),
            });
        }
    };
    let port = url.port().ok_or_else(|| EndpointParseError::MissingPort {
        input: input.to_owned(),
    })?;
    Ok(SocketEndpoint::tcp(host, port))
}

/// Reasons a textual jmpd endpoint is rejected.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// The text is not a URL at all.
    #[error("jmpd endpoint '{input}' is not a URL: {source}")]
    Malformed {
        input: String,
        #[source]
        source: url::ParseError,
    },
    /// Neither `unix` nor `tcp`.
    #[error("jmpd endpoint '{input}' uses scheme '{scheme}'; expected unix or tcp")]
    UnsupportedScheme { input: String, scheme: String },
    /// `tcp://` without a host.
    #[error("jmpd endpoint '{input}' names no TCP host")]
    MissingHost { input: String },
    /// `tcp://host` without a port.
    #[error("jmpd endpoint '{input}' names no TCP port")]
    MissingPort { input: String },
    /// `unix:` without a socket file name.
    #[error("jmpd endpoint '{input}' names no Unix socket file")]
    MissingUnixPath { input: String },
    /// `unix://name/...`, where the first path segment was read as a host.
    #[error("jmpd endpoint '{input}' has host '{host}'; write unix:///absolute/path")]
    UnixHost { input: String, host: String },
}

/// Failures creating the directory for a Unix socket.
#[derive(Debug, Error)]
pub enum EndpointPreparationError {
    /// The socket path is a filesystem root.
    #[error("jmpd socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// The parent directory could not be created.
    #[error("cannot create jmpd socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
