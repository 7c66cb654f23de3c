//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::EventFilter;
use shared_types::WsMessage;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

/// Listener registry: active subscription count per event name.
pub(crate) type ListenerRegistry = Arc<RwLock<HashMap<String, usize>>>;

/// Trait for sources that listeners can attach to.
pub trait EventSubscriber: Send + Sync {
    /// Register a listener for envelopes matching `filter`.
    ///
    /// The listener stays registered until the returned handle is dropped.
    fn subscribe(&self, filter: EventFilter) -> Subscription;

    /// Number of listeners currently registered.
    fn listener_count(&self) -> usize;
}

/// A registered listener.
///
/// When dropped, the listener is removed from the registry.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<WsMessage>,

    /// Filter for this subscription.
    filter: EventFilter,

    /// Registry this subscription is counted in.
    registry: ListenerRegistry,
}

impl Subscription {
    /// Create a new subscription and count it in the registry.
    pub(crate) fn new(
        receiver: broadcast::Receiver<WsMessage>,
        filter: EventFilter,
        registry: ListenerRegistry,
    ) -> Self {
        if let Ok(mut listeners) = registry.write() {
            *listeners.entry(filter.event.clone()).or_insert(0) += 1;
        }
        debug!(event = %filter.event, "Listener registered");

        Self {
            receiver,
            filter,
            registry,
        }
    }

    /// Receive the next envelope that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next matching envelope
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<WsMessage> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(
                        event = %self.filter.event,
                        lagged = count,
                        "Listener lagged, some events dropped"
                    );
                    continue;
                }
            };

            if self.filter.matches(&message) {
                return Some(message);
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Ok(mut listeners) = self.registry.write() else {
            return;
        };
        let Some(count) = listeners.get_mut(&self.filter.event) else {
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            listeners.remove(&self.filter.event);
        }
        debug!(event = %self.filter.event, "Listener removed");
    }
}
