//! # Shared Types Crate
//!
//! Wire-level types exchanged with the signal-generator/capture appliance.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every payload that crosses the HTTP control
//!   API or the WebSocket event feed is defined here.
//! - **Lossless Round-Trips**: payloads the appliance hands out and expects
//!   back (generator profiles) keep unknown fields verbatim.
//! - **Envelope First**: events are always `{event, data}` envelopes; typed
//!   payloads are decoded from the envelope, never the other way around.

pub mod entities;
pub mod envelope;
pub mod errors;

pub use entities::*;
pub use envelope::{events, WsMessage};
pub use errors::PayloadError;
