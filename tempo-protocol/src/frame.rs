//! Checksum framing for TTP.
//!
//! Frame layout (bytes on the wire, in order):
//!
//! ```text
//! +----------------------------------+----------+------------+
//! | body                             | CRC hex  | terminator |
//! | single-line UTF-8 JSON           | 8 chars  | \n \r      |
//! +----------------------------------+----------+------------+
//! ```
//!
//! The integrity code is the IEEE CRC-32 of the body bytes, rendered as
//! exactly eight zero-padded lowercase hex digits with no separator.

use crate::error::ProtocolError;
use crate::MAX_FRAME_SIZE;
use bytes::{BufMut, Bytes, BytesMut};

/// Width of the integrity code in hex digits.
pub const CRC_WIDTH: usize = 8;

/// Terminator marking end of frame for a line-oriented reader.
pub const FRAME_TERMINATOR: &[u8] = b"\n\r";

/// Renders the IEEE CRC-32 of `body` as eight zero-padded lowercase hex
/// digits.
pub fn crc_hex(body: &[u8]) -> String {
    format!("{:08x}", crc32fast::hash(body))
}

/// Wraps a message body into a complete frame.
///
/// The body must not contain raw newline or carriage-return bytes; they
/// would break frame delimiting on the receiving side.
pub fn wrap(body: &[u8]) -> Result<BytesMut, ProtocolError> {
    if body.iter().any(|&b| b == b'\n' || b == b'\r') {
        return Err(ProtocolError::EmbeddedNewline);
    }

    let size = body.len() + CRC_WIDTH + FRAME_TERMINATOR.len();
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = BytesMut::with_capacity(size);
    frame.put_slice(body);
    frame.put_slice(crc_hex(body).as_bytes());
    frame.put_slice(FRAME_TERMINATOR);
    Ok(frame)
}

/// Unwraps a raw frame, verifying its integrity code.
///
/// All newline and carriage-return bytes are stripped, the last eight
/// characters are taken as the given code, and the code is recomputed over
/// the remaining body and compared case-sensitively. Verification failures
/// are logged with both codes and the raw frame, and reported as errors;
/// this function never panics on untrusted input.
pub fn unwrap(raw: &[u8]) -> Result<Bytes, ProtocolError> {
    let stripped: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|&b| b != b'\n' && b != b'\r')
        .collect();

    if stripped.len() < CRC_WIDTH {
        tracing::error!(
            len = stripped.len(),
            raw = %String::from_utf8_lossy(raw),
            "frame too short to carry an integrity code"
        );
        return Err(ProtocolError::FrameTooShort {
            len: stripped.len(),
        });
    }

    let split = stripped.len() - CRC_WIDTH;
    let (body, given) = stripped.split_at(split);
    let computed = crc_hex(body);

    if given != computed.as_bytes() {
        let given = String::from_utf8_lossy(given).into_owned();
        tracing::error!(
            given = %given,
            computed = %computed,
            raw = %String::from_utf8_lossy(raw),
            "frame integrity check failed"
        );
        return Err(ProtocolError::CrcMismatch { given, computed });
    }

    Ok(Bytes::from(body.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let body = br#"{"Opcode": "GET_TIME_REMAINING", "UserID": "u123", "InputPayload": {}}"#;
        let frame = wrap(body).unwrap();

        assert!(frame.ends_with(FRAME_TERMINATOR));
        assert_eq!(frame.len(), body.len() + CRC_WIDTH + 2);

        let unwrapped = unwrap(&frame).unwrap();
        assert_eq!(unwrapped.as_ref(), body);
    }

    #[test]
    fn test_known_check_value() {
        // IEEE CRC-32 check value for "123456789".
        assert_eq!(crc_hex(b"123456789"), "cbf43926");

        let frame = wrap(b"123456789").unwrap();
        assert_eq!(&frame[..], b"123456789cbf43926\n\r");
    }

    #[test]
    fn test_wrap_rejects_embedded_newline() {
        assert!(matches!(
            wrap(b"line one\nline two"),
            Err(ProtocolError::EmbeddedNewline)
        ));
        assert!(matches!(
            wrap(b"carriage\rreturn"),
            Err(ProtocolError::EmbeddedNewline)
        ));
    }

    #[test]
    fn test_wrap_rejects_oversized_body() {
        let body = vec![b'x'; MAX_FRAME_SIZE];
        assert!(matches!(
            wrap(&body),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_unwrap_corrupted_checksum() {
        let mut frame = wrap(b"{}").unwrap();
        let idx = frame.len() - 3; // inside the hex code
        frame[idx] = if frame[idx] == b'0' { b'1' } else { b'0' };

        let result = unwrap(&frame);
        assert!(matches!(result, Err(ProtocolError::CrcMismatch { .. })));
    }

    #[test]
    fn test_unwrap_corrupted_body() {
        let mut frame = wrap(br#"{"Opcode": "GET_TIME_REMAINING"}"#).unwrap();
        frame[3] ^= 0x01;

        let result = unwrap(&frame);
        assert!(matches!(result, Err(ProtocolError::CrcMismatch { .. })));
    }

    #[test]
    fn test_unwrap_too_short() {
        let result = unwrap(b"abc\n\r");
        assert!(matches!(result, Err(ProtocolError::FrameTooShort { len: 3 })));
    }

    #[test]
    fn test_unwrap_empty_body() {
        let frame = wrap(b"").unwrap();
        let unwrapped = unwrap(&frame).unwrap();
        assert!(unwrapped.is_empty());
    }

    #[test]
    fn test_unwrap_ignores_stray_terminators() {
        // A reader may hand back the terminator plus a trailing newline.
        let mut frame = wrap(b"{}").unwrap().to_vec();
        frame.push(b'\n');
        let unwrapped = unwrap(&frame).unwrap();
        assert_eq!(unwrapped.as_ref(), b"{}");
    }

    proptest! {
        #[test]
        fn prop_roundtrip(body in proptest::collection::vec(
            any::<u8>().prop_filter("no newlines", |&b| b != b'\n' && b != b'\r'),
            0..512,
        )) {
            let frame = wrap(&body).unwrap();
            let unwrapped = unwrap(&frame).unwrap();
            prop_assert_eq!(unwrapped.as_ref(), &body[..]);
        }

        #[test]
        fn prop_checksum_bit_flip_detected(
            body in proptest::collection::vec(
                any::<u8>().prop_filter("no newlines", |&b| b != b'\n' && b != b'\r'),
                0..128,
            ),
            bit in 0usize..(CRC_WIDTH * 8),
        ) {
            let mut frame = wrap(&body).unwrap();
            let crc_start = frame.len() - FRAME_TERMINATOR.len() - CRC_WIDTH;
            frame[crc_start + bit / 8] ^= 1 << (bit % 8);
            prop_assert!(unwrap(&frame).is_err());
        }
    }
}
