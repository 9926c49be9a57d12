//! Protocol error types and their wire classification.

use crate::message::ReturnCode;
use thiserror::Error;

/// Protocol-level errors that can occur during framing or message handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("CRC mismatch: given {given}, computed {computed}")]
    CrcMismatch { given: String, computed: String },

    #[error("frame too short to carry a checksum: {len} bytes")]
    FrameTooShort { len: usize },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("message body contains a raw newline")]
    EmbeddedNewline,

    #[error("malformed JSON: {0}")]
    Parse(String),

    #[error("message violates the protocol schema: {0}")]
    Schema(String),

    #[error("invalid UTF-8 in frame body")]
    InvalidUtf8,
}

impl ProtocolError {
    /// Classifies a serde_json failure: syntax and premature-EOF errors are
    /// parse errors, data errors (missing keys, unknown enum values) are
    /// schema errors.
    pub fn from_json(err: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match err.classify() {
            Category::Data => ProtocolError::Schema(err.to_string()),
            _ => ProtocolError::Parse(err.to_string()),
        }
    }

    /// The return code a transport reports for this failure kind. One table
    /// drives both ends of the connection.
    pub fn return_code(&self) -> ReturnCode {
        match self {
            ProtocolError::CrcMismatch { .. } | ProtocolError::FrameTooShort { .. } => {
                ReturnCode::ErrCrc
            }
            ProtocolError::Parse(_) | ProtocolError::InvalidUtf8 => ReturnCode::ErrParse,
            ProtocolError::Schema(_) => ReturnCode::ErrPayload,
            ProtocolError::FrameTooLarge { .. } | ProtocolError::EmbeddedNewline => {
                ReturnCode::ErrGeneric
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_classification() {
        let syntax = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(
            ProtocolError::from_json(syntax),
            ProtocolError::Parse(_)
        ));

        #[derive(Debug, serde::Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            required: String,
        }
        let data = serde_json::from_str::<Strict>("{}").unwrap_err();
        assert!(matches!(
            ProtocolError::from_json(data),
            ProtocolError::Schema(_)
        ));
    }

    #[test]
    fn test_return_code_mapping() {
        let crc = ProtocolError::CrcMismatch {
            given: "00000000".into(),
            computed: "ffffffff".into(),
        };
        assert_eq!(crc.return_code(), ReturnCode::ErrCrc);

        assert_eq!(
            ProtocolError::Parse("bad".into()).return_code(),
            ReturnCode::ErrParse
        );
        assert_eq!(
            ProtocolError::Schema("missing".into()).return_code(),
            ReturnCode::ErrPayload
        );
        assert_eq!(
            ProtocolError::FrameTooShort { len: 3 }.return_code(),
            ReturnCode::ErrCrc
        );
    }
}
