//! Resolves the configured transports into explicit bindings.
//!
//! Operators describe transports with sentinels: a port of `-1` disables a
//! TCP transport and an empty socket path disables the Unix socket. The
//! resolver turns those settings into `Option`s so nothing downstream has to
//! interpret magic values.

use std::fmt;
use std::fs::DirBuilder;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::Config;
use crate::defaults::DISABLED_PORT;

/// The transports a server may listen on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportKind {
    /// Plain HTTP over TCP.
    #[strum(serialize = "http")]
    Plaintext,
    /// HTTP over TLS-wrapped TCP.
    #[strum(serialize = "https")]
    Tls,
    /// HTTP over a local domain socket.
    #[strum(serialize = "unix")]
    UnixSocket,
}

impl TransportKind {
    /// Start-up order for the transports.
    pub const ORDER: [Self; 3] = [Self::Plaintext, Self::Tls, Self::UnixSocket];
}

/// A TCP bind address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpBinding {
    /// Host name or IP literal.
    pub address: String,
    /// Port to bind. Zero requests an ephemeral port.
    pub port: u16,
}

impl TcpBinding {
    /// Builds a TCP binding.
    #[must_use]
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for TcpBinding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.contains(':') && !self.address.starts_with('[') {
            write!(formatter, "[{}]:{}", self.address, self.port)
        } else {
            write!(formatter, "{}:{}", self.address, self.port)
        }
    }
}

/// A TLS listener: TCP address plus PEM certificate chain and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsBinding {
    /// Address the TLS listener binds.
    pub tcp: TcpBinding,
    /// PEM encoded certificate chain.
    pub cert_file: Utf8PathBuf,
    /// PEM encoded private key.
    pub key_file: Utf8PathBuf,
}

/// A Unix domain socket listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixBinding {
    /// Socket file path.
    pub path: Utf8PathBuf,
    /// Octal permission string applied after binding. Parsed lazily so an
    /// invalid value never prevents the socket from being bound.
    pub permissions: String,
}

impl UnixBinding {
    /// Builds a Unix socket binding.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, permissions: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            permissions: permissions.into(),
        }
    }

    /// Socket path as a UTF-8 path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }

    /// Ensures the socket's parent directory exists with restrictive permissions.
    ///
    /// A bare file name resolves against the working directory, which always
    /// exists, so nothing is created for it.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(parent) = self.path.parent() else {
            return Err(SocketPreparationError::MissingParent {
                path: self.path.clone(),
            });
        };
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

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

/// One enabled transport with its bind parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSpec {
    /// Plain HTTP listener.
    Plaintext(TcpBinding),
    /// TLS listener.
    Tls(TlsBinding),
    /// Unix domain socket listener.
    UnixSocket(UnixBinding),
}

impl TransportSpec {
    /// Kind of transport described by this spec.
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Plaintext(_) => TransportKind::Plaintext,
            Self::Tls(_) => TransportKind::Tls,
            Self::UnixSocket(_) => TransportKind::UnixSocket,
        }
    }
}

impl fmt::Display for TransportSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext(binding) => write!(formatter, "http://{binding}"),
            Self::Tls(binding) => write!(formatter, "https://{}", binding.tcp),
            Self::UnixSocket(binding) => write!(formatter, "unix://{}", binding.path),
        }
    }
}

/// The enabled transports of a configuration snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportPlan {
    /// Plain HTTP listener, if enabled.
    pub plaintext: Option<TcpBinding>,
    /// TLS listener, if enabled.
    pub tls: Option<TlsBinding>,
    /// Unix socket listener, if enabled.
    pub unix: Option<UnixBinding>,
}

impl TransportPlan {
    /// Derives the plan from configuration. Pure: nothing is bound or created.
    pub fn resolve(config: &Config) -> Result<Self, ResolveError> {
        let plaintext = resolve_port(TransportKind::Plaintext, config.http_port)?
            .map(|port| TcpBinding::new(config.address.clone(), port));
        let tls = resolve_port(TransportKind::Tls, config.https_port)?.map(|port| TlsBinding {
            tcp: TcpBinding::new(config.address.clone(), port),
            cert_file: config.cert_file.clone(),
            key_file: config.key_file.clone(),
        });
        let unix = (!config.unix_file.as_str().is_empty())
            .then(|| UnixBinding::new(config.unix_file.clone(), config.unix_file_perm.clone()));
        Ok(Self {
            plaintext,
            tls,
            unix,
        })
    }

    /// Enabled transports in start-up order: plaintext, TLS, Unix socket.
    #[must_use]
    pub fn enabled(&self) -> Vec<TransportSpec> {
        let mut specs = Vec::with_capacity(TransportKind::ORDER.len());
        if let Some(binding) = &self.plaintext {
            specs.push(TransportSpec::Plaintext(binding.clone()));
        }
        if let Some(binding) = &self.tls {
            specs.push(TransportSpec::Tls(binding.clone()));
        }
        if let Some(binding) = &self.unix {
            specs.push(TransportSpec::UnixSocket(binding.clone()));
        }
        specs
    }

    /// Returns `true` when no transport is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plaintext.is_none() && self.tls.is_none() && self.unix.is_none()
    }

    /// Port of the plain HTTP listener, if enabled.
    #[must_use]
    pub fn http_port(&self) -> Option<u16> {
        self.plaintext.as_ref().map(|binding| binding.port)
    }

    /// Port of the TLS listener, if enabled.
    #[must_use]
    pub fn https_port(&self) -> Option<u16> {
        self.tls.as_ref().map(|binding| binding.tcp.port)
    }
}

fn resolve_port(kind: TransportKind, value: i32) -> Result<Option<u16>, ResolveError> {
    if value == DISABLED_PORT {
        return Ok(None);
    }
    u16::try_from(value)
        .map(Some)
        .map_err(|_| ResolveError::InvalidPort { kind, value })
}

/// Errors raised while resolving transports.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Port was neither the disable sentinel nor a valid TCP port.
    #[error("invalid {kind} port {value}: expected -1 or 0..=65535")]
    InvalidPort {
        /// Transport the port was configured for.
        kind: TransportKind,
        /// Configured value.
        value: i32,
    },
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Parent directory is missing when creating a Unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent {
        /// Configured socket path.
        path: Utf8PathBuf,
    },
    /// Failed to create or adjust socket directories.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
