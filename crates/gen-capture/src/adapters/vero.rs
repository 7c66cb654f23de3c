//! [`ApplianceSession`] over a live [`Vero`] session.

use std::time::Duration;

use async_trait::async_trait;
use shared_bus::EventSubscriber;
use shared_types::{
    CaptureConfiguration, ConnectorSource, GeneratorChannelId, GeneratorProfile, GenlockConfig, GenlockState,
};
use vero_client::{ClientError, Vero};

use crate::ports::ApplianceSession;

/// Adapter from the scenario port to the appliance client.
pub struct VeroSession {
    vero: Vero,
}

impl VeroSession {
    pub fn new(vero: Vero) -> Self {
        Self { vero }
    }

    /// Create a session for `address`.
    pub fn connect(address: &str) -> Result<Self, ClientError> {
        Vero::new(address).map(Self::new)
    }
}

#[async_trait]
impl ApplianceSession for VeroSession {
    fn events(&self) -> &dyn EventSubscriber {
        self.vero.events().as_ref()
    }

    fn has_event_feed(&self) -> bool {
        self.vero.has_event_feed()
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.vero.login(username, password).await
    }

    async fn set_genlock_sync(&self, config: &GenlockConfig, timeout: Duration) -> Result<GenlockState, ClientError> {
        self.vero.settings().set_genlock_sync(config, timeout).await
    }

    async fn profiles(&self) -> Result<Vec<GeneratorProfile>, ClientError> {
        self.vero.signal_generator().profiles().get_all().await
    }

    async fn start_generator(&self, channel: GeneratorChannelId, profile: &GeneratorProfile) -> Result<(), ClientError> {
        self.vero.signal_generator().start(channel, profile).await
    }

    async fn select_source(&self, kind: &str, index: usize, source: &ConnectorSource) -> Result<(), ClientError> {
        self.vero.capture().select_source(kind, index, source).await
    }

    async fn start_capture(&self, config: &CaptureConfiguration) -> Result<(), ClientError> {
        self.vero.capture().start(config).await
    }

    async fn close(&self) {
        self.vero.close().await;
    }
}
