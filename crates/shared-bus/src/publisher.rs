//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::EventFilter;
use crate::subscriber::{EventSubscriber, ListenerRegistry, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use shared_types::WsMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing envelopes to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an envelope to the bus.
    ///
    /// # Returns
    ///
    /// The number of active listeners that received the envelope.
    async fn publish(&self, message: WsMessage) -> usize;

    /// Get the total number of envelopes published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
/// semantics; every listener sees every envelope and filters locally.
pub struct InMemoryEventBus {
    /// Broadcast sender for envelopes.
    sender: broadcast::Sender<WsMessage>,

    /// Active listener count by event name.
    registry: ListenerRegistry,

    /// Total envelopes published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Number of listeners registered for one event name.
    #[must_use]
    pub fn listeners_for(&self, event: &str) -> usize {
        self.registry
            .read()
            .map(|listeners| listeners.get(event).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription::new(self.sender.subscribe(), filter, self.registry.clone())
    }

    fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, message: WsMessage) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let event = message.event.clone();
        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(event = %event, receivers, "Event published");
                receivers
            }
            Err(_) => {
                // Nobody is waiting on the feed right now
                trace!(event = %event, "Event dropped (no listeners)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
