//! # Vero Client
//!
//! Session with the signal-generator/capture appliance.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  HTTP (reqwest)   ┌────────────┐
//! │     Vero     │ ────────────────► │ control API│
//! │  (session)   │                   └────────────┘
//! │              │  Socket.IO feed   ┌────────────┐
//! │  EventFeed ◄─┼────────────────── │ event feed │
//! └──────┬───────┘                   └────────────┘
//!        │ publish
//!        ▼
//! InMemoryEventBus ──► Awaiter<T> (bounded, typed)
//! ```
//!
//! Every awaiter is armed before the request that triggers its event, so the
//! event cannot be missed between the request and the wait.

#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod awaiter;
pub mod capture;
pub mod error;
pub mod generator;
pub mod http;
pub mod routes;
pub mod session;
pub mod settings;
pub mod ws;

pub use awaiter::Awaiter;
pub use capture::Capture;
pub use error::ClientError;
pub use generator::{Profiles, SignalGenerator};
pub use http::ApiClient;
pub use session::Vero;
pub use settings::Settings;
pub use ws::EventFeed;
