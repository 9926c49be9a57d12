//! Client error taxonomy.
//!
//! Four distinguishable kinds, matching the protocol contract: channel
//! errors (no response exists at all), integrity errors (frame discarded),
//! decode errors (request considered unanswered), and logical failures
//! (well-formed response whose return code is not success, surfaced as
//! data). None of these is ever converted into a default response or
//! allowed to panic across the layer boundary.

use tempo_protocol::{Opcode, ProtocolError, ReturnCode};
use thiserror::Error;

/// Errors owned by the transport channel itself.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection refused")]
    Refused,

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("read timed out")]
    Timeout,

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("no frame terminator within {max} bytes")]
    FrameOverflow { max: usize },

    #[error("channel poisoned by an earlier failed exchange")]
    Poisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
}

impl ChannelError {
    /// Whether a caller may reasonably retry with a fresh channel.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ChannelError::TlsConfig(_) | ChannelError::FrameOverflow { .. })
    }
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connect or I/O failure; no response object was produced.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Frame integrity mismatch; the message was discarded unread.
    #[error("frame integrity check failed: given {given}, computed {computed}")]
    Integrity { given: String, computed: String },

    /// The response body failed strict parsing or schema validation; the
    /// request is considered unanswered.
    #[error("undecodable response: {0}")]
    Decode(ProtocolError),

    /// A well-formed response reported a non-success return code. The
    /// output payload must not be trusted beyond `message`.
    #[error("{opcode} failed for user {user_id:?}: {return_code} - {message}")]
    Failure {
        opcode: Opcode,
        user_id: String,
        return_code: ReturnCode,
        message: String,
    },

    /// No channel is currently open; callers must `connect()` first (or
    /// again, after a failed exchange).
    #[error("not connected")]
    NotConnected,
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::CrcMismatch { given, computed } => {
                ClientError::Integrity { given, computed }
            }
            ProtocolError::FrameTooShort { len } => ClientError::Integrity {
                given: format!("<{} bytes>", len),
                computed: String::new(),
            },
            other => ClientError::Decode(other),
        }
    }
}

impl ClientError {
    /// Whether a caller may reasonably retry with a fresh channel.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Channel(e) => e.is_retryable(),
            ClientError::Integrity { .. } => true,
            ClientError::NotConnected => true,
            ClientError::Decode(_) | ClientError::Failure { .. } => false,
        }
    }
}
