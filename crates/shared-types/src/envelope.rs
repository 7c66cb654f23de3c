//! # `WsMessage` Envelope
//!
//! Every event pushed by the appliance is wrapped in a `{event, data}`
//! envelope. `data` is an argument list; almost every event carries exactly
//! one payload in `data[0]`.

use crate::errors::PayloadError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Event names emitted by the appliance on its event feed.
pub mod events {
    /// Periodic generator status, including SFP telemetry.
    pub const GENERATOR_STATUS: &str = "generatorStatus";
    /// Genlock reference state changes.
    pub const GENLOCK_STATE: &str = "genlockState";
    /// Capture job lifecycle transitions.
    pub const CAPTURE_JOB_STATE: &str = "captureJobState";
    /// Socket.IO event name that carries a full `{event, data}` envelope.
    pub const MESSAGE: &str = "message";
}

/// The envelope flowing through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsMessage {
    /// Event name used for routing and filtering.
    pub event: String,

    /// Event arguments. A bare (non-array) value on the wire is treated as a
    /// single argument.
    #[serde(default, deserialize_with = "one_or_many")]
    pub data: Vec<Value>,
}

impl WsMessage {
    /// Create an envelope from an event name and its argument list.
    pub fn new(event: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// The first argument, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.data.first()
    }

    /// The first argument, or `null` when the event has no arguments.
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.data.into_iter().next().unwrap_or(Value::Null)
    }

    /// Decode the first argument into a typed payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        let value = self.first().ok_or_else(|| PayloadError::Missing {
            event: self.event.clone(),
        })?;
        serde_json::from_value(value.clone()).map_err(|source| PayloadError::Malformed {
            event: self.event.clone(),
            source,
        })
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}
