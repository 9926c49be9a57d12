//! JSON message types for TTP requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// TTP operation codes.
///
/// The accepted set is fixed per protocol version and must be identical on
/// both ends of the connection; an opcode unknown to the receiver fails
/// deserialization rather than being silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    /// Special opcode carried by a response whose return code is not
    /// `SUCCESS` and that cannot be attributed to a request.
    Error,

    // Timing queries
    GetTimeRemaining,
    GetCurrentPeriod,

    // User data queries
    GetUserPeriods,
    GetUserSettings,

    // User data updates
    SetUserPeriods,
    SetUserSettings,
    SetSchoolJson,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Error => "ERROR",
            Opcode::GetTimeRemaining => "GET_TIME_REMAINING",
            Opcode::GetCurrentPeriod => "GET_CURRENT_PERIOD",
            Opcode::GetUserPeriods => "GET_USER_PERIODS",
            Opcode::GetUserSettings => "GET_USER_SETTINGS",
            Opcode::SetUserPeriods => "SET_USER_PERIODS",
            Opcode::SetUserSettings => "SET_USER_SETTINGS",
            Opcode::SetSchoolJson => "SET_SCHOOL_JSON",
        };
        write!(f, "{}", name)
    }
}

/// Closed status classification returned by the transport.
///
/// Exactly one success value; these codes are part of the protocol contract
/// and must remain stable within a protocol version. An unrecognized value
/// received over the wire is itself a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnCode {
    /// The command was processed and returned a valid response.
    Success,
    /// No user identifier was provided for an operation that requires one.
    SignedOut,
    /// A formatting error exists in the request or response JSON.
    ErrParse,
    /// The parsed JSON is missing a key or carries an invalid value.
    ErrPayload,
    /// An internal error prevented a valid response from being produced.
    ErrResponse,
    /// The frame integrity check failed.
    ErrCrc,
    /// An unspecified error occurred.
    ErrGeneric,
}

impl ReturnCode {
    pub fn is_success(&self) -> bool {
        matches!(self, ReturnCode::Success)
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnCode::Success => "SUCCESS",
            ReturnCode::SignedOut => "SIGNED_OUT",
            ReturnCode::ErrParse => "ERR_PARSE",
            ReturnCode::ErrPayload => "ERR_PAYLOAD",
            ReturnCode::ErrResponse => "ERR_RESPONSE",
            ReturnCode::ErrCrc => "ERR_CRC",
            ReturnCode::ErrGeneric => "ERR_GENERIC",
        };
        write!(f, "{}", name)
    }
}

/// Request message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Operation to perform.
    #[serde(rename = "Opcode")]
    pub opcode: Opcode,

    /// Identifier of the authenticated user, absent for anonymous requests.
    #[serde(rename = "UserID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Operation-specific input payload.
    #[serde(
        rename = "InputPayload",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub input_payload: Option<Value>,
}

impl Request {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            user_id: None,
            input_payload: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.input_payload = Some(payload);
        self
    }
}

/// Response message envelope.
///
/// All four keys are required; anything else on the wire is a schema
/// violation. `OutputPayload` is only semantically valid when the return
/// code is `SUCCESS`; on failure it carries at least a `Message` field
/// with a human-readable diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Response {
    /// Echo of the request opcode.
    #[serde(rename = "Opcode")]
    pub opcode: Opcode,

    /// Echo of the request user identifier (may be empty).
    #[serde(rename = "UserID")]
    pub user_id: String,

    /// Status of the operation.
    #[serde(rename = "ReturnCode")]
    pub return_code: ReturnCode,

    /// Operation-specific output payload, shape defined per opcode.
    #[serde(rename = "OutputPayload")]
    pub output_payload: Value,
}

impl Response {
    /// Builds a success response carrying an opcode-specific payload.
    pub fn success(opcode: Opcode, user_id: impl Into<String>, payload: Value) -> Self {
        Self {
            opcode,
            user_id: user_id.into(),
            return_code: ReturnCode::Success,
            output_payload: payload,
        }
    }

    /// Builds a failure response whose payload carries the diagnostic
    /// message.
    pub fn failure(
        opcode: Opcode,
        user_id: impl Into<String>,
        return_code: ReturnCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            opcode,
            user_id: user_id.into(),
            return_code,
            output_payload: serde_json::json!({ "Message": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.return_code.is_success()
    }

    /// The human-readable diagnostic carried by failure responses.
    pub fn diagnostic(&self) -> Option<&str> {
        self.output_payload.get("Message").and_then(Value::as_str)
    }
}

// ============================================================================
// Opcode-specific payload schemas
// ============================================================================

/// Output for `GET_TIME_REMAINING`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeRemainingOutput {
    /// Time remaining in the current period, e.g. `"00:12:30"`.
    pub time_remaining: String,
    /// Wall-clock end of the current counted interval.
    pub end_time: String,
    /// Instant after which this answer is stale and should be re-requested.
    pub expire_time: String,
}

/// Output for `GET_CURRENT_PERIOD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurrentPeriodOutput {
    pub current_name: String,
    pub current_status: String,
    pub next_name: String,
    pub next_duration: String,
}

/// User-supplied properties of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeriodInfo {
    pub name: String,
    pub teacher: String,
    pub room: String,
}

/// Output for `GET_USER_PERIODS` and input for `SET_USER_PERIODS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPeriodsPayload {
    pub user_periods: HashMap<String, PeriodInfo>,
}

/// Output for `GET_USER_SETTINGS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserSettingsOutput {
    /// Display theme as six hex digits of RGB.
    pub theme: String,
    pub font: String,
    /// Name of the schedule definition file currently selected.
    pub school_json: String,
    pub available_schools: Vec<String>,
}

/// Input for `SET_USER_SETTINGS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserSettingsInput {
    pub theme: String,
    pub font: String,
    pub school_json: String,
}

/// Input for `SET_SCHOOL_JSON`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchoolJsonInput {
    /// Name the uploaded schedule definition is stored under.
    pub school_json: String,
    /// Raw JSON content of the schedule definition.
    pub content: String,
}
