//! Client error types.

use shared_types::PayloadError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::ws::CodecError;

/// Errors that can occur when talking to the appliance.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid appliance address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Appliance returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("Event feed error: {0}")]
    Feed(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
