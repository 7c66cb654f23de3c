//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! ```text
//! Engine.IO:  <type digit><payload>
//!   0 open  1 close  2 ping  3 pong  4 message  5 upgrade  6 noop
//!
//! Socket.IO (inside an Engine.IO message):
//!   <type digit>[/<namespace>,][<ack id>]<json>
//!   0 connect  1 disconnect  2 event  3 ack  4 connect_error
//! ```
//!
//! Binary packets (Socket.IO types 5 and 6) are not used by the appliance
//! and are rejected.

use serde::Deserialize;
use serde_json::Value;
use shared_types::{events, WsMessage};
use thiserror::Error;

/// Framing errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Empty packet")]
    Empty,

    #[error("Unknown {layer} packet type '{kind}'")]
    UnknownType { layer: &'static str, kind: char },

    #[error("Unsupported packet: {0}")]
    Unsupported(&'static str),

    #[error("Malformed packet payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed event: {0}")]
    MalformedEvent(&'static str),
}

/// Engine.IO open handshake.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
}

/// A decoded Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// A decoded Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack(Vec<Value>),
    ConnectError(Value),
}

impl EnginePacket {
    /// Decode one WebSocket text frame.
    pub fn decode(frame: &str) -> Result<Self, CodecError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(CodecError::Empty)?;
        let rest = chars.as_str();

        Ok(match kind {
            '0' => Self::Open(serde_json::from_str(rest)?),
            '1' => Self::Close,
            '2' => Self::Ping,
            '3' => Self::Pong,
            '4' => Self::Message(SocketPacket::decode(rest)?),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            other => {
                return Err(CodecError::UnknownType {
                    layer: "engine.io",
                    kind: other,
                })
            }
        })
    }

    /// Encode into a WebSocket text frame.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Message(packet) => format!("4{}", packet.encode()),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

impl SocketPacket {
    /// Decode the payload of an Engine.IO message.
    pub fn decode(payload: &str) -> Result<Self, CodecError> {
        let mut chars = payload.chars();
        let kind = chars.next().ok_or(CodecError::Empty)?;
        let body = strip_ack_id(strip_namespace(chars.as_str()));

        Ok(match kind {
            '0' => Self::Connect(parse_optional(body)?),
            '1' => Self::Disconnect,
            '2' => {
                let mut args = match serde_json::from_str::<Value>(body)? {
                    Value::Array(args) => args,
                    _ => return Err(CodecError::MalformedEvent("event is not an array")),
                };
                if args.is_empty() {
                    return Err(CodecError::MalformedEvent("event without a name"));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    _ => return Err(CodecError::MalformedEvent("event name is not a string")),
                };
                Self::Event { name, args }
            }
            '3' => match serde_json::from_str::<Value>(body)? {
                Value::Array(args) => Self::Ack(args),
                other => Self::Ack(vec![other]),
            },
            '4' => Self::ConnectError(parse_optional(body)?.unwrap_or(Value::Null)),
            '5' | '6' => return Err(CodecError::Unsupported("binary socket.io packet")),
            other => {
                return Err(CodecError::UnknownType {
                    layer: "socket.io",
                    kind: other,
                })
            }
        })
    }

    /// Encode into the payload of an Engine.IO message.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Connect(None) => "0".to_string(),
            Self::Connect(Some(auth)) => format!("0{auth}"),
            Self::Disconnect => "1".to_string(),
            Self::Event { name, args } => {
                let mut all = Vec::with_capacity(args.len() + 1);
                all.push(Value::String(name.clone()));
                all.extend(args.iter().cloned());
                format!("2{}", Value::Array(all))
            }
            Self::Ack(args) => format!("3{}", Value::Array(args.clone())),
            Self::ConnectError(data) => format!("4{data}"),
        }
    }

    /// Turn an event packet into a bus envelope.
    ///
    /// A `message` event whose first argument is itself an `{event, data}`
    /// envelope is unwrapped; any other event `name(args...)` becomes
    /// `{event: name, data: args}`. Non-event packets yield `None`.
    #[must_use]
    pub fn into_envelope(self) -> Option<WsMessage> {
        let Self::Event { name, args } = self else {
            return None;
        };

        if name == events::MESSAGE {
            if let Some(inner) = args
                .first()
                .filter(|v| v.get("event").is_some())
                .and_then(|v| serde_json::from_value::<WsMessage>(v.clone()).ok())
            {
                return Some(inner);
            }
        }
        Some(WsMessage::new(name, args))
    }
}

fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(comma) => &body[comma + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn strip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_optional(body: &str) -> Result<Option<Value>, CodecError> {
    if body.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(body)?))
    }
}
