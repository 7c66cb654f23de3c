//! # Shared Bus - Event Bus for the Appliance Event Feed
//!
//! Fans `{event, data}` envelopes from the WebSocket feed out to any number
//! of in-process listeners, and provides the bounded waiter the scenario
//! uses to block on a single condition.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  WS reader   │                    │ EventWaiter  │
//! │              │    publish()       │ (one-shot)   │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │  (registry)  │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Guarantees
//!
//! - **One listener per waiter:** a waiter holds exactly one subscription
//!   and releases it on every exit path (match, timeout, drop).
//! - **First resolution wins:** a waiter resolves once; events arriving
//!   after it resolved go nowhere.
//! - **Silence is a timeout:** a closed bus never resolves a waiter early.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;
pub mod waiter;

// Re-export main types
pub use events::EventFilter;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventSubscriber, Subscription};
pub use waiter::{wait_for, EventWaiter};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
