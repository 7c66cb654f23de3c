//! Signal generator control.

use std::time::Duration;

use serde::Deserialize;
use shared_bus::{EventFilter, EventSubscriber, EventWaiter};
use shared_types::{
    events, GeneratorChannelId, GeneratorProfile, GeneratorRunState, GeneratorStatus, GeneratorStatusEntry,
    PayloadError, WsMessage,
};
use tracing::info;

use crate::awaiter::Awaiter;
use crate::error::ClientError;
use crate::routes;
use crate::session::Vero;

#[derive(Debug, Deserialize)]
struct ProfileList {
    #[serde(default)]
    content: Vec<GeneratorProfile>,
}

/// Signal generator interface of a [`Vero`] session.
pub struct SignalGenerator<'a> {
    vero: &'a Vero,
}

impl<'a> SignalGenerator<'a> {
    pub(crate) fn new(vero: &'a Vero) -> Self {
        Self { vero }
    }

    /// Stored generator profiles.
    #[must_use]
    pub fn profiles(&self) -> Profiles<'a> {
        Profiles { vero: self.vero }
    }

    /// Start `profile` on `channel`.
    pub async fn start(&self, channel: GeneratorChannelId, profile: &GeneratorProfile) -> Result<(), ClientError> {
        info!(channel = %channel, profile = %profile.id, "Starting generator");
        self.vero
            .api()
            .put(&routes::generator_start(channel), profile)
            .await
    }

    /// Awaiter for `profile_id` running on `channel` with at least one
    /// active sender. Resolves to the reported sender status.
    #[must_use]
    pub fn make_awaiter(&self, channel: GeneratorChannelId, profile_id: &str, timeout: Duration) -> Awaiter<GeneratorStatus> {
        generator_running(self.vero.events().as_ref(), channel, profile_id, timeout)
    }

    /// Awaiter for the next `generatorStatus` entry of any kind.
    #[must_use]
    pub fn make_status_awaiter(&self, timeout: Duration) -> Awaiter<GeneratorStatusEntry> {
        generator_status(self.vero.events().as_ref(), timeout)
    }
}

/// Arm a wait on `source` for `profile_id` running on `channel`.
pub fn generator_running<S>(source: &S, channel: GeneratorChannelId, profile_id: &str, timeout: Duration) -> Awaiter<GeneratorStatus>
where
    S: EventSubscriber + ?Sized,
{
    let wanted = profile_id.to_string();
    let filter = EventFilter::matching(events::GENERATOR_STATUS, move |message: &WsMessage| {
        message
            .decode::<GeneratorRunState>()
            .is_ok_and(|state| state.is_running(channel, &wanted))
    });

    Awaiter::with_decoder(EventWaiter::new(source, filter, timeout), |message| {
        let state: GeneratorRunState = message.decode()?;
        state.status.ok_or(PayloadError::Missing {
            event: events::GENERATOR_STATUS.to_string(),
        })
    })
}

/// Arm a wait on `source` for any `generatorStatus` entry.
pub fn generator_status<S>(source: &S, timeout: Duration) -> Awaiter<GeneratorStatusEntry>
where
    S: EventSubscriber + ?Sized,
{
    Awaiter::decoding(EventWaiter::new(source, EventFilter::named(events::GENERATOR_STATUS), timeout))
}

/// Stored generator profiles.
pub struct Profiles<'a> {
    vero: &'a Vero,
}

impl Profiles<'_> {
    /// Every profile stored on the appliance.
    pub async fn get_all(&self) -> Result<Vec<GeneratorProfile>, ClientError> {
        let list: ProfileList = self.vero.api().get(routes::GENERATOR_PROFILES).await?;
        Ok(list.content)
    }
}
