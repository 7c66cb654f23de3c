//! Typed awaiters on top of the bus's bounded waiter.

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use serde::de::DeserializeOwned;
use shared_bus::EventWaiter;
use shared_types::{PayloadError, WsMessage};

use crate::error::ClientError;

type Decoder<T> = Box<dyn FnOnce(WsMessage) -> Result<T, PayloadError> + Send>;

/// An armed wait for one appliance event, decoded into `T`.
///
/// Resolves to `Ok(None)` on timeout. Create it before issuing the request
/// that triggers the event so the event cannot slip past.
pub struct Awaiter<T> {
    waiter: EventWaiter,
    decode: Decoder<T>,
}

impl<T: Send + 'static> Awaiter<T> {
    /// Decode the matched envelope's first argument as `T`.
    pub fn decoding(waiter: EventWaiter) -> Self
    where
        T: DeserializeOwned,
    {
        Self::with_decoder(waiter, |message| message.decode())
    }

    /// Decode the matched envelope with a custom function.
    pub fn with_decoder<F>(waiter: EventWaiter, decode: F) -> Self
    where
        F: FnOnce(WsMessage) -> Result<T, PayloadError> + Send + 'static,
    {
        Self {
            waiter,
            decode: Box::new(decode),
        }
    }

    /// Wait for the event.
    pub async fn wait(self) -> Result<Option<T>, ClientError> {
        let Self { waiter, decode } = self;
        match waiter.wait_message().await {
            Some(message) => Ok(Some(decode(message)?)),
            None => Ok(None),
        }
    }
}

impl<T: Send + 'static> IntoFuture for Awaiter<T> {
    type Output = Result<Option<T>, ClientError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
