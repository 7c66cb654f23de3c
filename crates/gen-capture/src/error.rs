//! Scenario errors.

use shared_types::CaptureJobState;
use thiserror::Error;
use vero_client::ClientError;

/// Ways a scenario run can fail. Each one ends the run; nothing is retried.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A one-shot wait ran out.
    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),

    #[error("Capture failed")]
    CaptureFailed(CaptureJobState),

    #[error("Pcap doesn't exist")]
    PcapMissing,

    #[error("Invalid profile selection '{input}' (expected 1..={available})")]
    InvalidProfileSelection { input: String, available: usize },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Console I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ScenarioError::Timeout("the generator to start").to_string(),
            "Timeout waiting for the generator to start"
        );
        assert_eq!(
            ScenarioError::CaptureFailed(CaptureJobState::Failed).to_string(),
            "Capture failed"
        );
        assert_eq!(ScenarioError::PcapMissing.to_string(), "Pcap doesn't exist");
    }

    #[test]
    fn test_client_error_is_transparent() {
        let err: ScenarioError = ClientError::NotLoggedIn.into();
        assert_eq!(err.to_string(), "Not logged in");
    }
}
