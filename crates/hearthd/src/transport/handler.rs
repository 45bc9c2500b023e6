//! Connection handling abstractions shared by every transport.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use rustls::{ServerConnection, StreamOwned};
use serde::Serialize;
use tracing::warn;

use hearth_config::TransportKind;

use super::LISTENER_TARGET;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types accepted by the listeners.
pub enum ConnectionStream {
    /// Plain TCP connection.
    Tcp(TcpStream),
    /// TLS session over TCP. The handshake completes on first read or write.
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
    /// Unix domain socket connection.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Transport the connection arrived on.
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        match self {
            Self::Tcp(_) => TransportKind::Plaintext,
            Self::Tls(_) => TransportKind::Tls,
            #[cfg(unix)]
            Self::Unix(_) => TransportKind::UnixSocket,
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// The request router: serves one accepted connection.
///
/// A single instance is shared by every listener, so implementations must be
/// immutable once constructed and should avoid panicking.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection.
    fn handle(&self, stream: ConnectionStream);
}

const MAX_HEAD_BYTES: usize = 64 * 1024;
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Serialize)]
struct StatusBody {
    service: &'static str,
    status: &'static str,
    transport: String,
}

/// Built-in router answering every request with a JSON status document.
///
/// Stands in until a real router is wired into the server.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusRouter;

impl ConnectionHandler for StatusRouter {
    fn handle(&self, mut stream: ConnectionStream) {
        match read_request_head(&mut stream) {
            Ok(Some(_)) => {}
            Ok(None) => return,
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "connection handler error"
                );
                return;
            }
        }

        let body = StatusBody {
            service: env!("CARGO_PKG_NAME"),
            status: "ok",
            transport: stream.transport().to_string(),
        };
        if let Err(error) = write_response(&mut stream, &body) {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "connection handler error"
            );
        }
    }
}

fn write_response(stream: &mut ConnectionStream, body: &StatusBody) -> io::Result<()> {
    let payload = serde_json::to_vec(body).map_err(io::Error::other)?;
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(&payload)?;
    if let ConnectionStream::Tls(tls) = stream {
        tls.conn.send_close_notify();
    }
    stream.flush()
}

fn read_request_head(stream: &mut ConnectionStream) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let bytes_read = read_chunk_with_retry(stream, &mut chunk)?;
        if bytes_read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }

        buffer.extend_from_slice(chunk.get(..bytes_read).unwrap_or_default());
        enforce_head_limit(buffer.len())?;
        if contains_terminator(&buffer) {
            return Ok(Some(buffer));
        }
    }
}

fn read_chunk_with_retry(stream: &mut ConnectionStream, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn contains_terminator(buffer: &[u8]) -> bool {
    buffer
        .windows(HEAD_TERMINATOR.len())
        .any(|window| window == HEAD_TERMINATOR)
}

fn enforce_head_limit(size: usize) -> io::Result<()> {
    if size > MAX_HEAD_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request head exceeds maximum size",
        ));
    }
    Ok(())
}
