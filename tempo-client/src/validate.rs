//! Response validation against the protocol contract.

use crate::error::ClientError;
use serde_json::Value;
use tempo_protocol::{codec, frame, Response};

const NO_DIAGNOSTIC: &str = "transport provided no diagnostic message";

/// Classifies a raw frame received from the transport.
///
/// The chain is: integrity check first (an integrity failure short-circuits
/// without attempting decode), then strict decode. Either failure means the
/// request is unanswered.
pub fn classify_frame(raw: &[u8]) -> Result<Response, ClientError> {
    let body = frame::unwrap(raw)?;
    let response = codec::decode_response(&body)?;
    Ok(response)
}

/// Turns a decoded, integrity-checked response into an outcome the caller
/// can act on.
///
/// On success the output payload is handed through uninterpreted (its shape
/// is opcode-specific and outside this layer's scope). Any other return
/// code is a logical failure: the caller gets the opcode, user id, return
/// code, and diagnostic message, and must not trust the payload beyond
/// that.
pub fn validate(response: Response) -> Result<Value, ClientError> {
    if response.is_success() {
        return Ok(response.output_payload);
    }

    let message = response
        .diagnostic()
        .unwrap_or(NO_DIAGNOSTIC)
        .to_string();
    tracing::debug!(
        opcode = %response.opcode,
        return_code = %response.return_code,
        message = %message,
        "transport reported a logical failure"
    );
    Err(ClientError::Failure {
        opcode: response.opcode,
        user_id: response.user_id,
        return_code: response.return_code,
        message,
    })
}
