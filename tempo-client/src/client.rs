//! High-level typed client API.

use crate::channel::{Channel, ChannelConfig};
use crate::error::{ChannelError, ClientError};
use crate::validate;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempo_protocol::message::{
    CurrentPeriodOutput, SchoolJsonInput, TimeRemainingOutput, UserPeriodsPayload,
    UserSettingsInput, UserSettingsOutput,
};
use tempo_protocol::{codec, Opcode, ProtocolError, Request};

/// Blocking client for the schedule transport.
///
/// The underlying channel is a single mutable resource guarded by a mutex:
/// concurrent callers are serialized, so sends and receives from different
/// callers can never interleave on one connection.
pub struct Client {
    config: ChannelConfig,
    channel: Mutex<Option<Channel>>,
}

impl Client {
    /// Creates a new client (not yet connected).
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            channel: Mutex::new(None),
        }
    }

    /// Opens the channel to the transport.
    pub fn connect(&self) -> Result<(), ClientError> {
        let channel = Channel::connect(&self.config)?;
        *self.channel.lock() = Some(channel);
        Ok(())
    }

    /// Whether a channel is currently open.
    pub fn is_connected(&self) -> bool {
        self.channel.lock().is_some()
    }

    /// Closes the channel. Idempotent.
    pub fn close(&self) {
        if let Some(mut channel) = self.channel.lock().take() {
            channel.close();
        }
    }

    /// Runs one blocking request/response exchange.
    ///
    /// Exactly one request is in flight at a time. After a channel,
    /// integrity, or decode error the channel is discarded; the caller must
    /// `connect()` again before the next call. A logical failure leaves the
    /// channel usable.
    fn call(&self, request: Request) -> Result<Value, ClientError> {
        fn exchange(channel: &mut Channel, frame: &[u8]) -> Result<Bytes, ChannelError> {
            channel.send(frame)?;
            channel.receive()
        }

        let frame = codec::encode_request(&request)?;

        let mut guard = self.channel.lock();
        let channel = guard.as_mut().ok_or(ClientError::NotConnected)?;

        tracing::debug!(opcode = %request.opcode, "sending request");
        let raw = match exchange(channel, &frame) {
            Ok(raw) => raw,
            Err(e) => {
                guard.take();
                return Err(e.into());
            }
        };

        let response = match validate::classify_frame(&raw) {
            Ok(response) => response,
            Err(e) => {
                guard.take();
                return Err(e);
            }
        };
        drop(guard);

        validate::validate(response)
    }

    fn call_typed<T: DeserializeOwned>(
        &self,
        opcode: Opcode,
        user_id: &str,
        payload: Value,
    ) -> Result<T, ClientError> {
        let request = Request::new(opcode).with_user(user_id).with_payload(payload);
        let output = self.call(request)?;
        serde_json::from_value(output)
            .map_err(|e| ClientError::Decode(ProtocolError::from_json(e)))
    }

    // =========================================================================
    // Timing queries
    // =========================================================================

    /// Requests the time remaining in the current period.
    pub fn get_time_remaining(&self, user_id: &str) -> Result<TimeRemainingOutput, ClientError> {
        self.call_typed(Opcode::GetTimeRemaining, user_id, serde_json::json!({}))
    }

    /// Requests the current and next period descriptions.
    pub fn get_current_period(&self, user_id: &str) -> Result<CurrentPeriodOutput, ClientError> {
        self.call_typed(Opcode::GetCurrentPeriod, user_id, serde_json::json!({}))
    }

    // =========================================================================
    // User data queries
    // =========================================================================

    /// Requests the user-defined properties of each period.
    pub fn get_user_periods(&self, user_id: &str) -> Result<UserPeriodsPayload, ClientError> {
        self.call_typed(Opcode::GetUserPeriods, user_id, serde_json::json!({}))
    }

    /// Requests the user's style and functional settings.
    pub fn get_user_settings(&self, user_id: &str) -> Result<UserSettingsOutput, ClientError> {
        self.call_typed(Opcode::GetUserSettings, user_id, serde_json::json!({}))
    }

    // =========================================================================
    // User data updates
    // =========================================================================

    /// Updates the user-defined properties of the given periods.
    pub fn set_user_periods(
        &self,
        user_id: &str,
        periods: &UserPeriodsPayload,
    ) -> Result<(), ClientError> {
        let payload = serde_json::to_value(periods)
            .map_err(|e| ClientError::Decode(ProtocolError::from_json(e)))?;
        let request = Request::new(Opcode::SetUserPeriods)
            .with_user(user_id)
            .with_payload(payload);
        self.call(request)?;
        Ok(())
    }

    /// Updates the user's settings.
    pub fn set_user_settings(
        &self,
        user_id: &str,
        settings: &UserSettingsInput,
    ) -> Result<(), ClientError> {
        let payload = serde_json::to_value(settings)
            .map_err(|e| ClientError::Decode(ProtocolError::from_json(e)))?;
        let request = Request::new(Opcode::SetUserSettings)
            .with_user(user_id)
            .with_payload(payload);
        self.call(request)?;
        Ok(())
    }

    /// Uploads a schedule definition file.
    pub fn set_school_json(
        &self,
        user_id: &str,
        school: &SchoolJsonInput,
    ) -> Result<(), ClientError> {
        let payload = serde_json::to_value(school)
            .map_err(|e| ClientError::Decode(ProtocolError::from_json(e)))?;
        let request = Request::new(Opcode::SetSchoolJson)
            .with_user(user_id)
            .with_payload(payload);
        self.call(request)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected() {
        let client = Client::new(ChannelConfig::new("127.0.0.1", 9340));
        assert!(!client.is_connected());
        let result = client.get_time_remaining("42");
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let client = Client::new(ChannelConfig::new("127.0.0.1", 9340));
        client.close();
        client.close();
        assert!(!client.is_connected());
    }
}
