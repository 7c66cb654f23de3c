//! Capture control.

use std::time::Duration;

use shared_bus::{EventFilter, EventSubscriber, EventWaiter};
use shared_types::{
    conditions_satisfied, events, CaptureConfiguration, CaptureJob, ConnectorSource, GeneratorStatusEntry,
    RateCondition, SfpTelemetry, WsMessage,
};
use tracing::info;

use crate::awaiter::Awaiter;
use crate::error::ClientError;
use crate::routes;
use crate::session::Vero;

/// Capture interface of a [`Vero`] session.
pub struct Capture<'a> {
    vero: &'a Vero,
}

impl<'a> Capture<'a> {
    pub(crate) fn new(vero: &'a Vero) -> Self {
        Self { vero }
    }

    /// Submit a capture job.
    pub async fn start(&self, config: &CaptureConfiguration) -> Result<(), ClientError> {
        info!(job = %config.id, duration_ms = config.duration, "Starting capture");
        self.vero.api().post(routes::CAPTURE_JOBS, config).await
    }

    /// Point connector `index` of `kind` (e.g. `video`) at `source`.
    pub async fn select_source(&self, kind: &str, index: usize, source: &ConnectorSource) -> Result<(), ClientError> {
        self.vero
            .api()
            .put(&routes::capture_source(kind, index), source)
            .await
    }

    /// Awaiter for job `job_id` reaching a terminal state.
    #[must_use]
    pub fn make_capture_awaiter(&self, job_id: &str, timeout: Duration) -> Awaiter<CaptureJob> {
        capture_finished(self.vero.events().as_ref(), job_id, timeout)
    }

    /// Awaiter for SFP telemetry satisfying every rate condition.
    #[must_use]
    pub fn make_sfp_state_awaiter(&self, conditions: Vec<RateCondition>, timeout: Duration) -> Awaiter<Vec<SfpTelemetry>> {
        sfp_rates(self.vero.events().as_ref(), conditions, timeout)
    }
}

/// Arm a wait on `source` for job `job_id` reaching a terminal state.
pub fn capture_finished<S>(source: &S, job_id: &str, timeout: Duration) -> Awaiter<CaptureJob>
where
    S: EventSubscriber + ?Sized,
{
    let wanted = job_id.to_string();
    let filter = EventFilter::matching(events::CAPTURE_JOB_STATE, move |message: &WsMessage| {
        message
            .decode::<CaptureJob>()
            .is_ok_and(|job| job.id == wanted && job.state.is_terminal())
    });
    Awaiter::decoding(EventWaiter::new(source, filter, timeout))
}

/// Arm a wait on `source` for SFP telemetry satisfying every condition.
///
/// An empty condition list accepts the first telemetry report.
pub fn sfp_rates<S>(source: &S, conditions: Vec<RateCondition>, timeout: Duration) -> Awaiter<Vec<SfpTelemetry>>
where
    S: EventSubscriber + ?Sized,
{
    let filter = EventFilter::matching(events::GENERATOR_STATUS, move |message: &WsMessage| {
        message
            .decode::<GeneratorStatusEntry>()
            .is_ok_and(|entry| conditions_satisfied(&conditions, &entry.sfps_telemetry))
    });

    Awaiter::with_decoder(EventWaiter::new(source, filter, timeout), |message| {
        let entry: GeneratorStatusEntry = message.decode()?;
        Ok(entry.sfps_telemetry)
    })
}
