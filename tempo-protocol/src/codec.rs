//! Canonical serialization between typed messages and frame bodies.
//!
//! Frame bodies originate from the network and are treated as untrusted
//! input: they are parsed strictly as JSON, never evaluated.

use crate::error::ProtocolError;
use crate::frame;
use crate::message::{Request, Response};
use bytes::BytesMut;

/// Encodes a request into a complete wire frame (body, integrity code,
/// terminator).
///
/// Serialization is single-line and deterministic, so the CRC computed over
/// the body is reproducible on the receiving side.
pub fn encode_request(request: &Request) -> Result<BytesMut, ProtocolError> {
    let body = serde_json::to_vec(request).map_err(ProtocolError::from_json)?;
    frame::wrap(&body)
}

/// Encodes a response into a complete wire frame.
pub fn encode_response(response: &Response) -> Result<BytesMut, ProtocolError> {
    let body = serde_json::to_vec(response).map_err(ProtocolError::from_json)?;
    frame::wrap(&body)
}

/// Decodes an unwrapped frame body into a response.
///
/// Decoding is two-stage: text that is not valid JSON is a parse error;
/// valid JSON that is not a conforming envelope (wrong top-level shape,
/// missing or extra keys, unknown enum values) is a schema error, never a
/// crash or a partially-populated value.
pub fn decode_response(body: &[u8]) -> Result<Response, ProtocolError> {
    serde_json::from_value(parse_body(body)?).map_err(|e| ProtocolError::Schema(e.to_string()))
}

/// Decodes an unwrapped frame body into a request (transport side).
pub fn decode_request(body: &[u8]) -> Result<Request, ProtocolError> {
    serde_json::from_value(parse_body(body)?).map_err(|e| ProtocolError::Schema(e.to_string()))
}

fn parse_body(body: &[u8]) -> Result<serde_json::Value, ProtocolError> {
    let text = std::str::from_utf8(body).map_err(|_| ProtocolError::InvalidUtf8)?;
    serde_json::from_str(text).map_err(|e| ProtocolError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Opcode, ReturnCode};

    #[test]
    fn test_request_roundtrip() {
        let request = Request::new(Opcode::GetTimeRemaining)
            .with_user("42")
            .with_payload(serde_json::json!({}));

        let encoded = encode_request(&request).unwrap();
        let body = frame::unwrap(&encoded).unwrap();
        let decoded = decode_request(&body).unwrap();

        assert_eq!(decoded, request);
    }

    #[test]
    fn test_request_roundtrip_anonymous() {
        let request = Request::new(Opcode::GetCurrentPeriod);
        let encoded = encode_request(&request).unwrap();
        let body = frame::unwrap(&encoded).unwrap();
        assert_eq!(decode_request(&body).unwrap(), request);
    }

    #[test]
    fn test_response_roundtrip() {
        let response = Response::success(
            Opcode::GetTimeRemaining,
            "42",
            serde_json::json!({
                "TimeRemaining": "00:12:30",
                "EndTime": "2026-08-27T15:00:00Z",
                "ExpireTime": "2026-08-27T15:00:00Z",
            }),
        );

        let encoded = encode_response(&response).unwrap();
        let body = frame::unwrap(&encoded).unwrap();
        let decoded = decode_response(&body).unwrap();

        assert_eq!(decoded, response);
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let result = decode_response(b"{\"Opcode\": ");
        assert!(matches!(result, Err(ProtocolError::Parse(_))));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        // Valid JSON of the wrong top-level shape is a schema violation,
        // not a parse failure.
        for body in [&b"[1, 2, 3]"[..], b"\"GET_TIME_REMAINING\"", b"42", b"null"] {
            let result = decode_response(body);
            assert!(
                matches!(result, Err(ProtocolError::Schema(_))),
                "non-object body {:?} not classified as schema error",
                String::from_utf8_lossy(body)
            );
        }
        assert!(matches!(
            decode_request(b"[1, 2, 3]"),
            Err(ProtocolError::Schema(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_keys() {
        // Each of the four envelope keys is required; dropping any one of
        // them is a schema error, never a partial accept.
        let full = serde_json::json!({
            "Opcode": "GET_TIME_REMAINING",
            "UserID": "42",
            "ReturnCode": "SUCCESS",
            "OutputPayload": {},
        });

        for key in ["Opcode", "UserID", "ReturnCode", "OutputPayload"] {
            let mut partial = full.clone();
            partial.as_object_mut().unwrap().remove(key);
            let body = serde_json::to_vec(&partial).unwrap();
            let result = decode_response(&body);
            assert!(
                matches!(result, Err(ProtocolError::Schema(_))),
                "missing {} not rejected",
                key
            );
        }
    }

    #[test]
    fn test_decode_rejects_extra_keys() {
        let body = br#"{
            "Opcode": "GET_TIME_REMAINING",
            "UserID": "42",
            "ReturnCode": "SUCCESS",
            "OutputPayload": {},
            "Extra": true
        }"#;
        // The body itself may not contain raw newlines on the wire, but the
        // decoder operates on any byte slice.
        let compact = serde_json::to_vec(
            &serde_json::from_slice::<serde_json::Value>(body).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            decode_response(&compact),
            Err(ProtocolError::Schema(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_return_code() {
        let body = serde_json::to_vec(&serde_json::json!({
            "Opcode": "GET_TIME_REMAINING",
            "UserID": "42",
            "ReturnCode": "ALMOST_WORKED",
            "OutputPayload": {},
        }))
        .unwrap();
        assert!(matches!(
            decode_response(&body),
            Err(ProtocolError::Schema(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let result = decode_response(&[0xff, 0xfe, 0x7b]);
        assert!(matches!(result, Err(ProtocolError::InvalidUtf8)));
    }

    #[test]
    fn test_decode_failure_response() {
        let body = serde_json::to_vec(&serde_json::json!({
            "Opcode": "SET_USER_SETTINGS",
            "UserID": "42",
            "ReturnCode": "ERR_PAYLOAD",
            "OutputPayload": { "Message": "missing Theme field" },
        }))
        .unwrap();
        let response = decode_response(&body).unwrap();
        assert_eq!(response.return_code, ReturnCode::ErrPayload);
        assert_eq!(response.diagnostic(), Some("missing Theme field"));
    }
}
