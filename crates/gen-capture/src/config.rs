//! # Scenario Configuration
//!
//! Every wait and every payload the scenario sends has a default equal to the
//! values the demo has always used. A JSON file can override any subset.
//!
//! ```json
//! {
//!   "timeouts": { "generator_start_ms": 3000 },
//!   "rate_conditions": [{ "kind": "moreThan", "rates": { "SFP A": 1000 } }]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::{
    CaptureConfiguration, ConnectorSource, GeneratorChannelId, GenlockConfig, GenlockFamily, RateCondition,
    SourceDescription, SourceEndpoint, SourceMeta, SourceNetwork,
};
use thiserror::Error;

/// Complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub timeouts: TimeoutConfig,
    pub genlock: GenlockSettings,
    pub generator: GeneratorSettings,
    /// Every condition must hold before the capture phase.
    pub rate_conditions: RateConditions,
    pub connector: ConnectorSettings,
    pub capture: CaptureSettings,
}

impl ScenarioConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a file may have gotten wrong.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_conditions.0.iter().any(|c| c.rates.is_empty()) {
            return Err(ConfigError::Invalid("rate condition without any SFP".into()));
        }
        if self.capture.name.trim().is_empty() {
            return Err(ConfigError::Invalid("capture name is empty".into()));
        }
        if self.capture.duration == 0 {
            return Err(ConfigError::Invalid("capture duration must be positive".into()));
        }
        if self.connector.kind.trim().is_empty() {
            return Err(ConfigError::Invalid("connector kind is empty".into()));
        }
        if self.timeouts.capture_ms == 0 {
            return Err(ConfigError::Invalid("capture timeout must be positive".into()));
        }
        Ok(())
    }

    /// Capture job settings with a fresh job id.
    #[must_use]
    pub fn capture_job(&self) -> CaptureConfiguration {
        CaptureConfiguration {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.capture.name.clone(),
            duration: self.capture.duration,
            sfp_a_enabled: self.capture.sfp_a_enabled,
            sfp_b_enabled: self.capture.sfp_b_enabled,
            enable_list_analysis: self.capture.enable_list_analysis,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One-shot wait limits, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub genlock_ms: u64,
    pub generator_start_ms: u64,
    pub sfp_status_ms: u64,
    pub min_rate_ms: u64,
    pub capture_ms: u64,
}

impl TimeoutConfig {
    pub fn genlock(&self) -> Duration {
        Duration::from_millis(self.genlock_ms)
    }

    pub fn generator_start(&self) -> Duration {
        Duration::from_millis(self.generator_start_ms)
    }

    pub fn sfp_status(&self) -> Duration {
        Duration::from_millis(self.sfp_status_ms)
    }

    pub fn min_rate(&self) -> Duration {
        Duration::from_millis(self.min_rate_ms)
    }

    pub fn capture(&self) -> Duration {
        Duration::from_millis(self.capture_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            genlock_ms: 5_000,
            generator_start_ms: 2_000,
            sfp_status_ms: 5_000,
            min_rate_ms: 4_000,
            capture_ms: 55_000,
        }
    }
}

/// Genlock reference to lock to before starting the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenlockSettings {
    pub family: GenlockFamily,
}

impl GenlockSettings {
    #[must_use]
    pub fn config(&self) -> GenlockConfig {
        GenlockConfig { family: self.family }
    }
}

impl Default for GenlockSettings {
    fn default() -> Self {
        Self {
            family: GenlockFamily::Genlock30M,
        }
    }
}

/// Generator output the chosen profile is started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub channel: GeneratorChannelId,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            channel: GeneratorChannelId::Channel1,
        }
    }
}

/// Minimum link rates, defaulting to any traffic on SFP A and 700 Mbit/s on
/// SFP B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateConditions(pub Vec<RateCondition>);

impl Default for RateConditions {
    fn default() -> Self {
        Self(vec![RateCondition::more_than([("SFP A", 0), ("SFP B", 700_000_000)])])
    }
}

/// Capture front-end slot and the source pushed to it with `--select-source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    pub kind: String,
    pub index: usize,
    pub source: ConnectorSource,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            kind: "video".to_string(),
            index: 0,
            source: ConnectorSource {
                enabled: true,
                source: SourceDescription {
                    id: "74c3ca30-0688-11ec-a847-11c4d6988837".to_string(),
                    meta: SourceMeta {
                        name: "Video #1".to_string(),
                    },
                    network: SourceNetwork {
                        primary: SourceEndpoint::new("239.200.1.1", 5000),
                        secondary: SourceEndpoint::new("239.100.1.1", 5000),
                        use_redundancy: true,
                    },
                },
            },
        }
    }
}

/// Capture job settings (the id is generated per run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub name: String,
    pub duration: u64,
    pub sfp_a_enabled: bool,
    pub sfp_b_enabled: bool,
    pub enable_list_analysis: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            name: "Capture test script".to_string(),
            duration: 200,
            sfp_a_enabled: true,
            sfp_b_enabled: true,
            enable_list_analysis: true,
        }
    }
}
