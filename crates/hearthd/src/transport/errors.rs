//! Error types for socket listener operations.

use std::io;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use rustls::pki_types::pem;
use thiserror::Error;

/// Errors surfaced while binding or running a listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Resolving the configured host failed.
    #[error("failed to resolve TCP address {address}: {source}")]
    Resolve {
        /// Configured `host:port`.
        address: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// The host resolved to no addresses.
    #[error("no TCP addresses resolved for {address}")]
    ResolveEmpty {
        /// Configured `host:port`.
        address: String,
    },
    /// Binding the TCP port failed, typically because it is in use.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The certificate chain could not be read.
    #[error("failed to read TLS certificates from {path}: {source}")]
    TlsCertificates {
        /// Certificate file.
        path: Utf8PathBuf,
        /// Underlying PEM error.
        #[source]
        source: pem::Error,
    },
    /// The certificate file held no certificates.
    #[error("no TLS certificates found in {path}")]
    TlsNoCertificates {
        /// Certificate file.
        path: Utf8PathBuf,
    },
    /// The private key could not be read.
    #[error("failed to read TLS private key from {path}: {source}")]
    TlsPrivateKey {
        /// Key file.
        path: Utf8PathBuf,
        /// Underlying PEM error.
        #[source]
        source: pem::Error,
    },
    /// rustls rejected the certificate and key pair.
    #[error("invalid TLS configuration: {source}")]
    TlsConfig {
        /// Underlying rustls error.
        #[source]
        source: rustls::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Accepting failed with an error that retrying cannot fix.
    #[error("failed to accept connections on {endpoint}: {source}")]
    Accept {
        /// Listener endpoint.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Configured socket path.
        endpoint: String,
    },
    /// Binding the Unix socket failed.
    #[cfg(unix)]
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another process is accepting on the socket path.
    #[cfg(unix)]
    #[error("existing unix socket {path} is already in use")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// The socket path is occupied by something other than a socket.
    #[cfg(unix)]
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket {
        /// Socket path.
        path: String,
    },
    /// Inspecting an existing socket path failed.
    #[cfg(unix)]
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Connecting to an existing socket failed for a reason other than staleness.
    #[cfg(unix)]
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A stale socket file could not be removed.
    #[cfg(unix)]
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A listener or supervisor thread could not be spawned.
    #[error("failed to spawn listener thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A listener or supervisor thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
