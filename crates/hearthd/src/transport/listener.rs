//! Listener implementation for the HTTP, HTTPS and Unix socket transports.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use tracing::{debug, warn};

use hearth_config::{TcpBinding, TransportKind, TransportSpec};

use super::tls::load_server_config;
use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to one transport.
#[derive(Debug)]
pub(crate) struct SocketListener {
    spec: TransportSpec,
    listener: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    Tls {
        listener: TcpListener,
        config: Arc<ServerConfig>,
    },
    #[cfg(unix)]
    Unix(UnixListener),
}

impl SocketListener {
    /// Binds the transport. TLS material is loaded before the port is taken.
    pub(crate) fn bind(spec: &TransportSpec) -> Result<Self, ListenerError> {
        let listener = match spec {
            TransportSpec::Plaintext(binding) => ListenerKind::Tcp(bind_tcp(binding)?),
            TransportSpec::Tls(binding) => {
                let config = load_server_config(binding)?;
                ListenerKind::Tls {
                    listener: bind_tcp(&binding.tcp)?,
                    config,
                }
            }
            TransportSpec::UnixSocket(binding) => {
                #[cfg(unix)]
                {
                    ListenerKind::Unix(bind_unix(binding.path().as_std_path())?)
                }

                #[cfg(not(unix))]
                {
                    return Err(ListenerError::UnsupportedUnix {
                        endpoint: binding.path.to_string(),
                    });
                }
            }
        };
        Ok(Self {
            spec: spec.clone(),
            listener,
        })
    }

    pub(crate) fn kind(&self) -> TransportKind {
        self.spec.kind()
    }

    /// Bound TCP address; `None` for Unix sockets.
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) | ListenerKind::Tls { listener, .. } => {
                listener.local_addr().ok()
            }
            #[cfg(unix)]
            ListenerKind::Unix(_) => None,
        }
    }

    /// Human-readable endpoint, using the bound port when one was assigned.
    pub(crate) fn endpoint(&self) -> String {
        match (&self.spec, self.local_addr()) {
            (TransportSpec::Plaintext(_), Some(addr)) => format!("http://{addr}"),
            (TransportSpec::Tls(_), Some(addr)) => format!("https://{addr}"),
            (spec, _) => spec.to_string(),
        }
    }

    /// Accepts connections until `shutdown` is raised or a fatal error occurs.
    ///
    /// Transient accept errors are retried with a backoff. The Unix socket
    /// file is removed when the loop exits for any reason.
    pub(crate) fn serve(
        &self,
        shutdown: &AtomicBool,
        handler: &Arc<dyn ConnectionHandler>,
    ) -> Result<(), ListenerError> {
        let result = self.run_accept_loop(shutdown, handler);
        #[cfg(unix)]
        self.cleanup_unix_socket();
        result
    }

    fn run_accept_loop(
        &self,
        shutdown: &AtomicBool,
        handler: &Arc<dyn ConnectionHandler>,
    ) -> Result<(), ListenerError> {
        self.set_nonblocking()
            .map_err(|source| ListenerError::NonBlocking { source })?;
        debug!(
            target: LISTENER_TARGET,
            endpoint = %self.spec,
            "socket listener active"
        );
        let mut last_error = None::<io::ErrorKind>;
        while !shutdown.load(Ordering::SeqCst) {
            match self.accept_connection() {
                Ok(Some(stream)) => {
                    last_error = None;
                    let handler = Arc::clone(handler);
                    thread::spawn(move || handler.handle(stream));
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(AcceptError::Connection(error)) => {
                    warn!(
                        target: LISTENER_TARGET,
                        endpoint = %self.spec,
                        error = %error,
                        "dropping connection"
                    );
                }
                Err(AcceptError::Listener(error)) if is_transient(&error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: LISTENER_TARGET,
                            endpoint = %self.spec,
                            error = %error,
                            "socket accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
                Err(AcceptError::Listener(source)) => {
                    return Err(ListenerError::Accept {
                        endpoint: self.spec.to_string(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    fn set_nonblocking(&self) -> io::Result<()> {
        match &self.listener {
            ListenerKind::Tcp(listener) | ListenerKind::Tls { listener, .. } => {
                listener.set_nonblocking(true)
            }
            #[cfg(unix)]
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    fn accept_connection(&self) -> Result<Option<ConnectionStream>, AcceptError> {
        match &self.listener {
            ListenerKind::Tcp(listener) => Ok(accept_tcp(listener)?.map(ConnectionStream::Tcp)),
            ListenerKind::Tls { listener, config } => match accept_tcp(listener)? {
                Some(stream) => {
                    let session = ServerConnection::new(Arc::clone(config))
                        .map_err(|error| AcceptError::Connection(io::Error::other(error)))?;
                    Ok(Some(ConnectionStream::Tls(Box::new(StreamOwned::new(
                        session, stream,
                    )))))
                }
                None => Ok(None),
            },
            #[cfg(unix)]
            ListenerKind::Unix(listener) => match listener.accept() {
                Ok((stream, _)) => {
                    stream
                        .set_nonblocking(false)
                        .map_err(AcceptError::Connection)?;
                    Ok(Some(ConnectionStream::Unix(stream)))
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
                Err(error) => Err(AcceptError::Listener(error)),
            },
        }
    }

    #[cfg(unix)]
    fn cleanup_unix_socket(&self) {
        let TransportSpec::UnixSocket(binding) = &self.spec else {
            return;
        };
        if let Err(error) = fs::remove_file(binding.path().as_std_path())
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                path = %binding.path,
                "failed to remove unix socket file"
            );
        }
    }
}

/// Accept failures split by whether the listener or one connection failed.
enum AcceptError {
    Listener(io::Error),
    Connection(io::Error),
}

fn accept_tcp(listener: &TcpListener) -> Result<Option<TcpStream>, AcceptError> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream
                .set_nonblocking(false)
                .map_err(AcceptError::Connection)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(AcceptError::Listener(error)),
    }
}

/// Accept errors the loop survives: aborted peers and descriptor exhaustion.
pub(crate) fn is_transient(error: &io::Error) -> bool {
    if matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    ) {
        return true;
    }
    error.raw_os_error().map(Errno::from_raw).is_some_and(|errno| {
        matches!(
            errno,
            Errno::EMFILE | Errno::ENFILE | Errno::ENOBUFS | Errno::ENOMEM | Errno::EPROTO
        )
    })
}

fn bind_tcp(binding: &TcpBinding) -> Result<TcpListener, ListenerError> {
    let address = binding.to_string();
    let mut addrs = (binding.address.as_str(), binding.port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            address: address.clone(),
            source,
        })?;
    let addr = addrs
        .next()
        .ok_or(ListenerError::ResolveEmpty { address })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
                path: path.display().to_string(),
                source,
            })?;
        if !metadata.file_type().is_socket() {
            return Err(ListenerError::UnixNotSocket {
                path: path.display().to_string(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ListenerError::UnixInUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(error) => {
                return Err(ListenerError::UnixConnect {
                    path: path.display().to_string(),
                    source: error,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}
