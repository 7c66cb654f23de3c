//! # Event Filters
//!
//! Decide which envelopes a subscription delivers.

use shared_types::WsMessage;
use std::fmt;
use std::sync::Arc;

/// Content check applied after the event name matched.
pub type EventPredicate = Arc<dyn Fn(&WsMessage) -> bool + Send + Sync>;

/// Filter for a subscription: an event name plus an optional content check.
#[derive(Clone)]
pub struct EventFilter {
    /// Event name that must match exactly.
    pub event: String,

    /// Optional predicate; `None` accepts any payload for `event`.
    predicate: Option<EventPredicate>,
}

impl EventFilter {
    /// Accept every envelope named `event`.
    pub fn named(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            predicate: None,
        }
    }

    /// Accept envelopes named `event` for which `predicate` holds.
    pub fn matching<F>(event: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&WsMessage) -> bool + Send + Sync + 'static,
    {
        Self {
            event: event.into(),
            predicate: Some(Arc::new(predicate)),
        }
    }

    /// Check if an envelope matches this filter.
    #[must_use]
    pub fn matches(&self, message: &WsMessage) -> bool {
        if message.event != self.event {
            return false;
        }
        self.predicate.as_ref().map_or(true, |p| p(message))
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter")
            .field("event", &self.event)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}
