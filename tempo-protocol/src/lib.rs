//! # tempo-protocol
//!
//! Wire protocol implementation for TTP (Tempo Transport Protocol), the
//! request/response protocol binding a presentation tier to the schedule
//! transport.
//!
//! This crate provides:
//! - Checksum framing (CRC-32 integrity code + line terminator)
//! - JSON message serialization/deserialization
//! - Request/Response envelope types with per-opcode payload schemas
//! - The closed opcode and return-code sets shared by both ends

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{decode_request, decode_response, encode_request, encode_response};
pub use error::ProtocolError;
pub use frame::{unwrap, wrap, CRC_WIDTH, FRAME_TERMINATOR};
pub use message::{Opcode, Request, Response, ReturnCode};

/// Protocol version supported by this implementation.
///
/// The opcode and return-code sets are frozen per version. There is no
/// in-band negotiation: both ends are configured for the same version, and
/// a receiver treats anything outside its version's sets as a schema
/// violation.
pub const PROTOCOL_VERSION: u16 = 2;

/// Default port the schedule transport listens on.
pub const DEFAULT_PORT: u16 = 9340;

/// Maximum size of a complete frame in bytes (body + code + terminator).
pub const MAX_FRAME_SIZE: usize = 8 * 1024;
