//! # Appliance Port
//!
//! The scenario drives the appliance only through [`ApplianceSession`], so it
//! can run against a real session or an in-process fake.
//!
//! Awaiters are armed on [`ApplianceSession::events`] directly, before the
//! action that triggers the awaited event.

use std::time::Duration;

use async_trait::async_trait;
use shared_bus::EventSubscriber;
use shared_types::{
    CaptureConfiguration, ConnectorSource, GeneratorChannelId, GeneratorProfile, GenlockConfig, GenlockState,
};
use vero_client::ClientError;

/// Control surface of one appliance session.
#[async_trait]
pub trait ApplianceSession: Send + Sync {
    /// Event source carrying the appliance feed.
    fn events(&self) -> &dyn EventSubscriber;

    /// Whether events are actually arriving from the appliance.
    fn has_event_feed(&self) -> bool;

    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError>;

    /// Select the genlock reference and wait for it to lock.
    async fn set_genlock_sync(&self, config: &GenlockConfig, timeout: Duration) -> Result<GenlockState, ClientError>;

    async fn profiles(&self) -> Result<Vec<GeneratorProfile>, ClientError>;

    async fn start_generator(&self, channel: GeneratorChannelId, profile: &GeneratorProfile) -> Result<(), ClientError>;

    async fn select_source(&self, kind: &str, index: usize, source: &ConnectorSource) -> Result<(), ClientError>;

    async fn start_capture(&self, config: &CaptureConfiguration) -> Result<(), ClientError>;

    /// Release the session. Must be safe to call more than once.
    async fn close(&self);
}
