//! # Gen-Capture
//!
//! Signal generator and capture demo for the broadcast appliance.
//!
//! ## Modular Structure
//!
//! - `config` - Scenario defaults and the optional JSON override file
//! - `ports` - The appliance surface the scenario depends on
//! - `adapters` - Port implementation over the live client
//! - `scenario` - The `gen-capture-pcap` run
//!
//! ```text
//! CLI ──► scenario ──► ApplianceSession ──► VeroSession ──► appliance
//!              │                                  │
//!              └──── awaiters on events() ◄───────┘ event feed
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod ports;
pub mod scenario;

pub use adapters::VeroSession;
pub use config::{ConfigError, ScenarioConfig};
pub use error::ScenarioError;
pub use ports::ApplianceSession;
pub use scenario::{gen_capture_pcap, RunOptions, RunReport};
