//! Appliance settings.

use std::time::Duration;

use shared_bus::{EventFilter, EventSubscriber, EventWaiter};
use shared_types::{events, GenlockConfig, GenlockState, WsMessage};
use tracing::info;

use crate::awaiter::Awaiter;
use crate::error::ClientError;
use crate::routes;
use crate::session::Vero;

/// Settings interface of a [`Vero`] session.
pub struct Settings<'a> {
    vero: &'a Vero,
}

impl<'a> Settings<'a> {
    pub(crate) fn new(vero: &'a Vero) -> Self {
        Self { vero }
    }

    /// Select the genlock reference and wait until the appliance reports it
    /// locked.
    pub async fn set_genlock_sync(&self, config: &GenlockConfig, timeout: Duration) -> Result<GenlockState, ClientError> {
        let awaiter = self.make_genlock_awaiter(config, timeout);
        self.vero.api().put(routes::GENLOCK, config).await?;

        let state = awaiter.await?.ok_or(ClientError::Timeout("genlock to lock"))?;
        info!(family = ?state.family, "Genlock locked");
        Ok(state)
    }

    /// Awaiter for a locked `genlockState` of the configured family.
    #[must_use]
    pub fn make_genlock_awaiter(&self, config: &GenlockConfig, timeout: Duration) -> Awaiter<GenlockState> {
        genlock_locked(self.vero.events().as_ref(), config, timeout)
    }
}

/// Arm a wait on `source` for the genlock of `config` to report locked.
pub fn genlock_locked<S>(source: &S, config: &GenlockConfig, timeout: Duration) -> Awaiter<GenlockState>
where
    S: EventSubscriber + ?Sized,
{
    let family = config.family;
    let filter = EventFilter::matching(events::GENLOCK_STATE, move |message: &WsMessage| {
        message
            .decode::<GenlockState>()
            .is_ok_and(|state| state.locked && state.family == family)
    });
    Awaiter::decoding(EventWaiter::new(source, filter, timeout))
}
