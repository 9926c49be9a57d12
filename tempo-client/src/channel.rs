//! Transport channel: one connection, blocking whole-frame send/receive.
//!
//! A channel carries exactly one outstanding request at a time; there is no
//! pipelining and no multiplexing. Any framing or I/O error poisons the
//! channel, and callers must close it and connect a fresh one before the
//! next exchange.

use crate::error::ChannelError;
use crate::tls::{self, TlsClientConfig};
use bytes::{Bytes, BytesMut};
use rustls::{ClientConnection, StreamOwned};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tempo_protocol::{FRAME_TERMINATOR, MAX_FRAME_SIZE};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default receive timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum accepted frame-size limit (1 KiB).
pub const MIN_FRAME_LIMIT: usize = 1024;

/// Maximum accepted frame-size limit (1 MiB).
pub const MAX_FRAME_LIMIT: usize = 1024 * 1024;

const READ_CHUNK: usize = 4096;

/// Channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Transport host name or address.
    pub host: String,
    /// Transport port.
    pub port: u16,
    /// Bound on connection establishment.
    pub connect_timeout: Duration,
    /// Bound on waiting for a frame terminator.
    pub read_timeout: Duration,
    /// Largest frame accepted before the exchange is abandoned.
    pub max_frame_size: usize,
    /// TLS settings (None for a plain socket).
    pub tls: Option<TlsClientConfig>,
}

impl ChannelConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
            tls: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size.clamp(MIN_FRAME_LIMIT, MAX_FRAME_LIMIT);
        self
    }

    pub fn with_tls(mut self, tls: TlsClientConfig) -> Self {
        self.tls = Some(tls);
        self
    }
}

/// Distinguishes the connect failures callers react to differently: a
/// timed-out connect and a refused one both map to their own variants,
/// anything else stays an I/O error.
fn classify_connect_error(e: io::Error) -> ChannelError {
    match e.kind() {
        io::ErrorKind::TimedOut => ChannelError::ConnectTimeout,
        io::ErrorKind::ConnectionRefused => ChannelError::Refused,
        _ => ChannelError::Io(e),
    }
}

/// The underlying socket, plain or TLS-wrapped.
enum ChannelStream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl ChannelStream {
    fn shutdown(&self) {
        let sock = match self {
            ChannelStream::Plain(s) => s,
            ChannelStream::Tls(s) => s.get_ref(),
        };
        let _ = sock.shutdown(std::net::Shutdown::Both);
    }
}

impl Read for ChannelStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ChannelStream::Plain(s) => s.read(buf),
            ChannelStream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for ChannelStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ChannelStream::Plain(s) => s.write(buf),
            ChannelStream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ChannelStream::Plain(s) => s.flush(),
            ChannelStream::Tls(s) => s.flush(),
        }
    }
}

/// One logical stream to the transport.
pub struct Channel {
    stream: Option<ChannelStream>,
    buf: BytesMut,
    max_frame_size: usize,
    poisoned: bool,
}

impl Channel {
    /// Opens a connection to the transport.
    ///
    /// Refused, timed-out, and interrupted connects are classified; there is
    /// no automatic retry.
    pub fn connect(config: &ChannelConfig) -> Result<Self, ChannelError> {
        tracing::debug!(host = %config.host, port = config.port, "connecting to transport");

        let addr = (config.host.as_str(), config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                ChannelError::Io(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "host resolved to no addresses",
                ))
            })?;

        let sock = TcpStream::connect_timeout(&addr, config.connect_timeout)
            .map_err(classify_connect_error)?;
        sock.set_nodelay(true).ok();
        sock.set_read_timeout(Some(config.read_timeout))?;

        let stream = match &config.tls {
            Some(tls_config) => {
                let mut conn = tls::client_connection(tls_config, &config.host)?;
                let mut sock = sock;
                while conn.is_handshaking() {
                    conn.complete_io(&mut sock)
                        .map_err(|e| ChannelError::TlsHandshake(e.to_string()))?;
                }
                tracing::debug!("TLS handshake complete");
                ChannelStream::Tls(Box::new(StreamOwned::new(conn, sock)))
            }
            None => ChannelStream::Plain(sock),
        };

        tracing::debug!("channel established");
        Ok(Self {
            stream: Some(stream),
            buf: BytesMut::with_capacity(READ_CHUNK),
            max_frame_size: config.max_frame_size,
            poisoned: false,
        })
    }

    fn stream(&mut self) -> Result<&mut ChannelStream, ChannelError> {
        if self.poisoned {
            return Err(ChannelError::Poisoned);
        }
        match self.stream.as_mut() {
            Some(s) => Ok(s),
            None => Err(ChannelError::ConnectionClosed),
        }
    }

    /// Writes one complete frame. Partial writes are retried internally
    /// until the frame is out or the socket reports an unrecoverable error.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        fn write_frame(stream: &mut ChannelStream, frame: &[u8]) -> io::Result<()> {
            stream.write_all(frame)?;
            stream.flush()
        }

        let stream = self.stream()?;
        if let Err(e) = write_frame(stream, frame) {
            self.poisoned = true;
            return Err(ChannelError::Io(e));
        }
        tracing::debug!(bytes = frame.len(), "frame sent");
        Ok(())
    }

    /// Blocks until a complete frame (through its terminator) is available,
    /// the configured size limit is exhausted, or the read timeout elapses.
    /// Returns the raw bytes up to and including the terminator.
    pub fn receive(&mut self) -> Result<Bytes, ChannelError> {
        let max = self.max_frame_size;
        loop {
            if let Some(pos) = self
                .buf
                .windows(FRAME_TERMINATOR.len())
                .position(|w| w == FRAME_TERMINATOR)
            {
                let frame = self.buf.split_to(pos + FRAME_TERMINATOR.len()).freeze();
                tracing::debug!(bytes = frame.len(), "frame received");
                return Ok(frame);
            }

            if self.buf.len() >= max {
                self.poisoned = true;
                return Err(ChannelError::FrameOverflow { max });
            }

            let stream = self.stream()?;
            let mut chunk = [0u8; READ_CHUNK];
            match stream.read(&mut chunk) {
                Ok(0) => {
                    self.poisoned = true;
                    return Err(ChannelError::ConnectionClosed);
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
                {
                    self.poisoned = true;
                    return Err(ChannelError::Timeout);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.poisoned = true;
                    return Err(ChannelError::Io(e));
                }
            }
        }
    }

    /// Whether an earlier exchange failed on this channel.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Releases the underlying connection. Idempotent.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::debug!("closing channel");
            stream.shutdown();
        }
        self.buf.clear();
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}
