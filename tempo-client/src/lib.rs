//! # tempo-client
//!
//! Client library for TTP, the protocol binding a presentation tier to the
//! schedule transport.
//!
//! This crate provides:
//! - A blocking transport channel with connect/timeout/close lifecycle
//! - Response validation against the protocol contract
//! - A typed, opcode-per-method client API
//! - Optional TLS via rustls
//!
//! The client never computes schedule state itself; it renders whatever the
//! transport returns. Retry and backoff policy is left to the caller.

pub mod channel;
pub mod client;
pub mod error;
pub mod tls;
pub mod validate;

pub use channel::{Channel, ChannelConfig};
pub use client::Client;
pub use error::{ChannelError, ClientError};
pub use tls::TlsClientConfig;
