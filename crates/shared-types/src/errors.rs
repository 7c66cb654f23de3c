//! # Error Types
//!
//! Errors raised while moving payloads in and out of envelopes.

use thiserror::Error;

/// Errors from decoding an envelope payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The envelope carried no payload at the requested position.
    #[error("Event '{event}' carries no payload")]
    Missing { event: String },

    /// The payload did not have the expected shape.
    #[error("Malformed payload for event '{event}': {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}
