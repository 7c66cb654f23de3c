//! # Bounded Event Waiter
//!
//! Waits for the first envelope matching a filter, or gives up after a
//! timeout. The deadline is fixed when the waiter is created, so a waiter
//! can be armed before the action that triggers the event:
//!
//! ```rust,ignore
//! let started = EventWaiter::new(&bus, EventFilter::named("generatorStatus"), timeout);
//! client.start_generator().await?;
//! let status = started.await; // Some(payload) or None on timeout
//! ```

use crate::events::EventFilter;
use crate::subscriber::{EventSubscriber, Subscription};
use serde_json::Value;
use shared_types::WsMessage;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A one-shot wait for a matching envelope.
///
/// Holds exactly one subscription on the source. The subscription is
/// released when the wait resolves (match or timeout) or when the waiter is
/// dropped without being awaited.
pub struct EventWaiter {
    subscription: Subscription,
    deadline: Instant,
}

impl EventWaiter {
    /// Arm a waiter on `source`. The timeout starts counting now.
    pub fn new<S>(source: &S, filter: EventFilter, timeout: Duration) -> Self
    where
        S: EventSubscriber + ?Sized,
    {
        Self {
            subscription: source.subscribe(filter),
            deadline: Instant::now() + timeout,
        }
    }

    /// Wait for the first matching envelope and return it whole.
    ///
    /// Returns `None` if the deadline passes first.
    pub async fn wait_message(self) -> Option<WsMessage> {
        let Self {
            mut subscription,
            deadline,
        } = self;

        let outcome = tokio::select! {
            biased;
            message = recv_until_closed(&mut subscription) => Some(message),
            () = tokio::time::sleep_until(deadline) => None,
        };

        match &outcome {
            Some(_) => debug!(event = %subscription.filter().event, "Waiter matched"),
            None => debug!(event = %subscription.filter().event, "Waiter timed out"),
        }
        // Unregisters the listener on both paths
        drop(subscription);

        outcome
    }

    /// Wait for the first matching envelope and return its first argument.
    ///
    /// Returns `None` if the deadline passes first.
    pub async fn wait(self) -> Option<Value> {
        self.wait_message().await.map(WsMessage::into_payload)
    }
}

impl IntoFuture for EventWaiter {
    type Output = Option<Value>;
    type IntoFuture = Pin<Box<dyn Future<Output = Option<Value>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

/// Arm a waiter and await it immediately.
pub async fn wait_for<S>(source: &S, filter: EventFilter, timeout: Duration) -> Option<Value>
where
    S: EventSubscriber + ?Sized,
{
    EventWaiter::new(source, filter, timeout).wait().await
}

/// Receive the next match; a closed source never yields, leaving the
/// deadline to resolve the wait.
async fn recv_until_closed(subscription: &mut Subscription) -> WsMessage {
    match subscription.recv().await {
        Some(message) => message,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use serde_json::json;
    use std::sync::Arc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_on_first_match_not_at_deadline() {
        let bus = Arc::new(InMemoryEventBus::new());
        let started = Instant::now();
        let waiter = EventWaiter::new(&*bus, EventFilter::named("status"), ms(100));

        let publisher = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(10)).await;
            publisher.publish(WsMessage::new("other", vec![])).await;
            tokio::time::sleep(ms(10)).await;
            publisher
                .publish(WsMessage::new("status", vec![json!({"ok": true})]))
                .await;
        });

        let result = waiter.await;

        assert_eq!(result, Some(json!({"ok": true})));
        let elapsed = started.elapsed();
        assert!(elapsed >= ms(20) && elapsed < ms(100), "resolved at {elapsed:?}");
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_events() {
        let bus = InMemoryEventBus::new();
        let started = Instant::now();

        let result = wait_for(&bus, EventFilter::named("status"), ms(100)).await;

        assert_eq!(result, None);
        assert!(started.elapsed() >= ms(100));
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.listeners_for("status"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_matching_then_matching() {
        let bus = InMemoryEventBus::new();
        let waiter = EventWaiter::new(&bus, EventFilter::named("status"), ms(100));
        assert_eq!(bus.listener_count(), 1);

        bus.publish(WsMessage::new("other", vec![json!(1)])).await;
        bus.publish(WsMessage::new("status", vec![json!(2)])).await;

        assert_eq!(waiter.await, Some(json!(2)));
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_event_after_timeout_is_inert() {
        let bus = InMemoryEventBus::new();

        let result = wait_for(&bus, EventFilter::named("status"), ms(50)).await;
        assert_eq!(result, None);

        // Nobody is listening any more; publishing must not fail or resolve anything
        let receivers = bus.publish(WsMessage::new("status", vec![json!(1)])).await;
        assert_eq!(receivers, 0);
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_filters_content() {
        let bus = InMemoryEventBus::new();
        let filter = EventFilter::matching("job", |m| {
            m.first().and_then(|v| v.get("id")) == Some(&json!("mine"))
        });
        let waiter = EventWaiter::new(&bus, filter, ms(100));

        bus.publish(WsMessage::new("job", vec![json!({"id": "theirs"})])).await;
        bus.publish(WsMessage::new("job", vec![json!({"id": "mine", "n": 1})])).await;

        assert_eq!(waiter.await, Some(json!({"id": "mine", "n": 1})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_do_not_cross_talk() {
        let bus = Arc::new(InMemoryEventBus::new());
        let a = EventWaiter::new(&*bus, EventFilter::named("a"), ms(100));
        let b = EventWaiter::new(&*bus, EventFilter::named("b"), ms(100));
        let never = EventWaiter::new(&*bus, EventFilter::named("c"), ms(30));
        assert_eq!(bus.listener_count(), 3);

        let publisher = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(5)).await;
            publisher.publish(WsMessage::new("b", vec![json!("for b")])).await;
            tokio::time::sleep(ms(5)).await;
            publisher.publish(WsMessage::new("a", vec![json!("for a")])).await;
        });

        let (ra, rb, rc) = tokio::join!(a.wait(), b.wait(), never.wait());

        assert_eq!(ra, Some(json!("for a")));
        assert_eq!(rb, Some(json!("for b")));
        assert_eq!(rc, None);
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_source_falls_through_to_timeout() {
        let bus = InMemoryEventBus::new();
        let started = Instant::now();
        let waiter = EventWaiter::new(&bus, EventFilter::named("status"), ms(100));
        drop(bus);

        assert_eq!(waiter.await, None);
        assert!(started.elapsed() >= ms(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_counts_from_creation() {
        let bus = InMemoryEventBus::new();
        let started = Instant::now();
        let waiter = EventWaiter::new(&bus, EventFilter::named("status"), ms(100));

        // Time spent before awaiting eats into the timeout
        tokio::time::sleep(ms(60)).await;
        assert_eq!(waiter.await, None);
        assert!(started.elapsed() >= ms(100));
        assert!(started.elapsed() < ms(160));
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_buffered_before_await_is_delivered() {
        let bus = InMemoryEventBus::new();
        let waiter = EventWaiter::new(&bus, EventFilter::named("status"), ms(100));

        bus.publish(WsMessage::new("status", vec![json!("early")])).await;
        tokio::time::sleep(ms(10)).await;

        assert_eq!(waiter.await, Some(json!("early")));
    }

    #[tokio::test]
    async fn test_zero_timeout() {
        let bus = InMemoryEventBus::new();
        assert_eq!(wait_for(&bus, EventFilter::named("status"), ms(0)).await, None);
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_unawaited_waiter_unsubscribes() {
        let bus = InMemoryEventBus::new();
        let waiter = EventWaiter::new(&bus, EventFilter::named("status"), ms(100));
        assert_eq!(bus.listener_count(), 1);
        drop(waiter);
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_data_resolves_null() {
        let bus = InMemoryEventBus::new();
        let waiter = EventWaiter::new(&bus, EventFilter::named("status"), ms(100));
        bus.publish(WsMessage::new("status", vec![])).await;
        assert_eq!(waiter.await, Some(Value::Null));
    }
}
