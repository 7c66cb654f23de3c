//! # Appliance Entities
//!
//! Payloads of the appliance's control API and event feed.
//!
//! ## Clusters
//!
//! - **Timing**: `GenlockFamily`, `GenlockConfig`, `GenlockState`
//! - **Generator**: `GeneratorProfile`, `GeneratorStatus`, `GeneratorStatusEntry`, `GeneratorRunState`
//! - **Link**: `SfpTelemetry`, `RateCondition`
//! - **Capture**: `CaptureConfiguration`, `CaptureJob`, `ConnectorSource`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// CLUSTER A: TIMING
// =============================================================================

/// Genlock reference families supported by the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenlockFamily {
    /// 30 MHz family (29.97/59.94 based rates).
    Genlock30M,
    /// 25 MHz family (25/50 based rates).
    Genlock25M,
    /// 24 MHz family (23.98/24 based rates).
    Genlock24M,
    /// PTP derived reference.
    Ptp,
}

/// Genlock configuration pushed to the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenlockConfig {
    pub family: GenlockFamily,
}

/// Genlock state reported on the event feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenlockState {
    pub family: GenlockFamily,
    #[serde(default)]
    pub locked: bool,
}

// =============================================================================
// CLUSTER B: GENERATOR
// =============================================================================

/// Generator output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeneratorChannelId {
    Channel1,
    Channel2,
}

impl GeneratorChannelId {
    /// Identifier used on the wire and in URL paths.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel1 => "channel1",
            Self::Channel2 => "channel2",
        }
    }
}

impl fmt::Display for GeneratorChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signal-generator profile as stored on the appliance.
///
/// Profiles are fetched, lightly edited, and sent back to start the
/// generator, so every field this crate does not model is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorProfile {
    pub id: String,
    pub meta: ProfileMeta,
    #[serde(default)]
    pub senders: ProfileSenders,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Descriptive metadata of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMeta {
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Senders of a profile, grouped by essence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSenders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Vec<ProfileSender>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<ProfileSender>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anc: Option<Vec<ProfileSender>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single sender definition inside a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSender {
    #[serde(default)]
    pub network: SenderNetworkSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Network settings of a profile sender.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderNetworkSettings {
    #[serde(default)]
    pub use_redundancy: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GeneratorProfile {
    /// Human readable name shown when listing profiles.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.meta.description
    }

    /// All senders in video, audio, anc order.
    pub fn senders_mut(&mut self) -> impl Iterator<Item = &mut ProfileSender> {
        let ProfileSenders {
            video, audio, anc, ..
        } = &mut self.senders;
        video
            .iter_mut()
            .chain(audio.iter_mut())
            .chain(anc.iter_mut())
            .flatten()
    }

    /// Enable redundancy (dual-path output) on every sender.
    ///
    /// Returns the number of senders touched.
    pub fn force_redundancy(&mut self) -> usize {
        let mut count = 0;
        for sender in self.senders_mut() {
            sender.network.use_redundancy = true;
            count += 1;
        }
        count
    }
}

/// Destination of one leg of an active sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEndpoint {
    pub dest_addr: String,
    pub dest_port: u16,
}

/// Network state of an active sender.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSenderNetwork {
    #[serde(default)]
    pub primary: Option<NetworkEndpoint>,
    #[serde(default)]
    pub secondary: Option<NetworkEndpoint>,
}

/// A sender the generator is currently transmitting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSender {
    #[serde(default)]
    pub network: ActiveSenderNetwork,
}

/// Senders the generator reports as running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorStatus {
    pub video: Vec<ActiveSender>,
    pub audio: Vec<ActiveSender>,
    pub anc: Vec<ActiveSender>,
}

impl GeneratorStatus {
    /// All active senders in video, audio, anc order.
    pub fn active_senders(&self) -> impl Iterator<Item = &ActiveSender> {
        self.video.iter().chain(&self.audio).chain(&self.anc)
    }

    /// Whether at least one sender is running.
    #[must_use]
    pub fn has_active_senders(&self) -> bool {
        self.active_senders().next().is_some()
    }

    /// Multicast destinations of every active sender.
    #[must_use]
    pub fn source_addresses(&self) -> Vec<SourceAddress> {
        self.active_senders().map(SourceAddress::from).collect()
    }
}

/// One entry of the `generatorStatus` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorStatusEntry {
    #[serde(default)]
    pub channel: Option<GeneratorChannelId>,
    #[serde(default, rename = "profileId")]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub status: Option<GeneratorStatus>,
    #[serde(default)]
    pub sfps_telemetry: Vec<SfpTelemetry>,
}

/// What a `generatorStatus` entry says is running, without its telemetry.
///
/// Decoding this instead of a full [`GeneratorStatusEntry`] keeps a running
/// check independent of how the SFP counters are reported.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeneratorRunState {
    #[serde(default)]
    pub channel: Option<GeneratorChannelId>,
    #[serde(default, rename = "profileId")]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub status: Option<GeneratorStatus>,
}

impl GeneratorRunState {
    /// Whether `profile_id` runs on `channel` with at least one active sender.
    #[must_use]
    pub fn is_running(&self, channel: GeneratorChannelId, profile_id: &str) -> bool {
        self.channel == Some(channel)
            && self.profile_id.as_deref() == Some(profile_id)
            && self
                .status
                .as_ref()
                .is_some_and(GeneratorStatus::has_active_senders)
    }
}

// =============================================================================
// CLUSTER C: LINK
// =============================================================================

/// Per-SFP rate counters, in bits per second.
///
/// The appliance reports averaged rates, so either counter may carry a
/// fractional part. The number is kept as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SfpTelemetry {
    pub sfp: String,
    #[serde(default = "zero_rate")]
    pub rx_rate: Number,
    #[serde(default = "zero_rate")]
    pub tx_rate: Number,
}

impl SfpTelemetry {
    #[must_use]
    pub fn rx_bps(&self) -> f64 {
        bits_per_second(&self.rx_rate)
    }

    #[must_use]
    pub fn tx_bps(&self) -> f64 {
        bits_per_second(&self.tx_rate)
    }
}

fn zero_rate() -> Number {
    Number::from(0u8)
}

// NaN fails every comparison, so an unrepresentable rate never satisfies a condition.
fn bits_per_second(rate: &Number) -> f64 {
    rate.as_f64().unwrap_or(f64::NAN)
}

/// Comparison applied by a `RateCondition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RateConditionKind {
    MoreThan,
    LessThan,
}

/// A receive-rate requirement on one or more SFPs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCondition {
    pub kind: RateConditionKind,
    /// Threshold in bits per second, keyed by SFP name (e.g. `"SFP A"`).
    pub rates: BTreeMap<String, Number>,
}

impl RateCondition {
    /// A `moreThan` condition over the given thresholds.
    pub fn more_than<I, S, N>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: Into<Number>,
    {
        Self {
            kind: RateConditionKind::MoreThan,
            rates: rates.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Whether every SFP named by this condition is present in `telemetry`
    /// and its receive rate passes the comparison.
    #[must_use]
    pub fn is_satisfied_by(&self, telemetry: &[SfpTelemetry]) -> bool {
        self.rates.iter().all(|(sfp, threshold)| {
            let threshold = bits_per_second(threshold);
            telemetry
                .iter()
                .find(|t| &t.sfp == sfp)
                .is_some_and(|t| match self.kind {
                    RateConditionKind::MoreThan => t.rx_bps() > threshold,
                    RateConditionKind::LessThan => t.rx_bps() < threshold,
                })
        })
    }
}

/// Whether every condition holds for `telemetry`.
#[must_use]
pub fn conditions_satisfied(conditions: &[RateCondition], telemetry: &[SfpTelemetry]) -> bool {
    conditions.iter().all(|c| c.is_satisfied_by(telemetry))
}

// =============================================================================
// CLUSTER D: CAPTURE
// =============================================================================

/// Settings of a capture job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfiguration {
    pub id: String,
    pub name: String,
    pub duration: u64,
    pub sfp_a_enabled: bool,
    pub sfp_b_enabled: bool,
    pub enable_list_analysis: bool,
}

/// Lifecycle state of a capture job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureJobState {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl CaptureJobState {
    /// Whether the job will not change state any more.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for CaptureJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Output of a finished capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    #[serde(default)]
    pub pcap_id: Option<String>,
    #[serde(default)]
    pub analysis: Option<Value>,
}

/// A capture job as reported on the event feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureJob {
    pub id: String,
    pub state: CaptureJobState,
    #[serde(default)]
    pub result: Option<CaptureResult>,
}

/// A multicast group and port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multicast_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<u16>,
}

impl MulticastEndpoint {
    /// Endpoint with both address and port set.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            multicast_address: Some(address.into()),
            destination_port: Some(port),
        }
    }
}

impl From<Option<&NetworkEndpoint>> for MulticastEndpoint {
    fn from(endpoint: Option<&NetworkEndpoint>) -> Self {
        Self {
            multicast_address: endpoint.map(|e| e.dest_addr.clone()),
            destination_port: endpoint.map(|e| e.dest_port),
        }
    }
}

/// Primary and secondary destinations of a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAddress {
    pub primary: MulticastEndpoint,
    pub secondary: MulticastEndpoint,
}

impl From<&ActiveSender> for SourceAddress {
    fn from(sender: &ActiveSender) -> Self {
        Self {
            primary: sender.network.primary.as_ref().into(),
            secondary: sender.network.secondary.as_ref().into(),
        }
    }
}

/// A capture source destination. The capture API carries the port as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEndpoint {
    pub multicast_address: String,
    #[serde(deserialize_with = "port_text")]
    pub destination_port: String,
}

impl SourceEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            multicast_address: address.into(),
            destination_port: port.to_string(),
        }
    }
}

/// Accepts `"5000"` as well as `5000`.
fn port_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u16),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(text) => text,
        Port::Number(port) => port.to_string(),
    })
}

/// Network settings of a capture source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNetwork {
    pub primary: SourceEndpoint,
    pub secondary: SourceEndpoint,
    pub use_redundancy: bool,
}

/// Display metadata of a capture source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub name: String,
}

/// A stream description the capture front-end can be pointed at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescription {
    pub id: String,
    pub meta: SourceMeta,
    pub network: SourceNetwork,
}

/// A capture connector slot and the source assigned to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorSource {
    pub enabled: bool,
    pub source: SourceDescription,
}
