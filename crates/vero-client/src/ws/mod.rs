//! Event feed: Socket.IO over Engine.IO over WebSocket.
//!
//! The appliance pushes `{event, data}` envelopes; the feed decodes the
//! framing and republishes every envelope on the shared bus.

mod client;
mod engine_io;

pub use client::EventFeed;
pub use engine_io::{CodecError, EnginePacket, Handshake, SocketPacket};
