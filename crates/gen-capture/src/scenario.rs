//! # The `gen-capture-pcap` Scenario
//!
//! ```text
//! login ─► genlock lock ─► list profiles ─► choose ─► force redundancy
//!   ─► arm generator awaiter ─► start generator ─► print sender addresses
//!   ─► [feed] print SFP A rx rate ─► wait for minimum rates
//!   ─► [--capture] select source? ─► arm capture awaiter ─► start capture
//! ```
//!
//! Every wait is one-shot. The session is closed on every path.

use std::io::Write;

use serde::Serialize;
use shared_types::{CaptureJob, CaptureJobState, GeneratorProfile, SfpTelemetry, SourceAddress};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn, Instrument};
use vero_client::capture::{capture_finished, sfp_rates};
use vero_client::generator::{generator_running, generator_status};
use vero_telemetry::step_span;

use crate::config::ScenarioConfig;
use crate::error::ScenarioError;
use crate::ports::ApplianceSession;

/// Per-run choices taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub username: String,
    pub password: String,
    /// 1-based profile number; prompt on stdin when absent.
    pub profile: Option<usize>,
    /// Run the capture phase after the minimum rate is reached.
    pub capture: bool,
    /// Push the configured connector source before capturing.
    pub select_source: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            username: "user".to_string(),
            password: "user".to_string(),
            profile: None,
            capture: false,
            select_source: false,
        }
    }
}

/// What a successful run observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub profile_id: String,
    pub source_addresses: Vec<SourceAddress>,
    /// Receive rate of the first SFP, when the feed delivered a status.
    pub first_rx_rate: Option<serde_json::Number>,
    /// Telemetry that satisfied the rate conditions.
    pub sfp_telemetry: Vec<SfpTelemetry>,
    pub capture: Option<CaptureJob>,
}

/// Run the scenario against `session`, reading the profile choice from
/// `input` and writing the listing and results to `output`.
pub async fn gen_capture_pcap<S, R, W>(
    session: &S,
    config: &ScenarioConfig,
    options: &RunOptions,
    input: &mut R,
    output: &mut W,
) -> Result<RunReport, ScenarioError>
where
    S: ApplianceSession + ?Sized,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let result = run(session, config, options, input, output)
        .instrument(step_span!("gen-capture-pcap"))
        .await;
    session.close().await;

    if let Err(e) = &result {
        warn!(error = %e, "Scenario failed");
    }
    result
}

async fn run<S, R, W>(
    session: &S,
    config: &ScenarioConfig,
    options: &RunOptions,
    input: &mut R,
    output: &mut W,
) -> Result<RunReport, ScenarioError>
where
    S: ApplianceSession + ?Sized,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    session.login(&options.username, &options.password).await?;
    session
        .set_genlock_sync(&config.genlock.config(), config.timeouts.genlock())
        .await?;

    let profiles = session.profiles().await?;
    list_profiles(&profiles, output)?;

    let index = match options.profile {
        Some(number) => profile_index(&number.to_string(), profiles.len())?,
        None => {
            let answer = prompt(input, output, "Choose a profile: ").await?;
            profile_index(&answer, profiles.len())?
        }
    };
    let Some(mut profile) = profiles.into_iter().nth(index) else {
        return Err(ScenarioError::InvalidProfileSelection {
            input: (index + 1).to_string(),
            available: 0,
        });
    };
    let forced = profile.force_redundancy();
    info!(profile = %profile.id, senders = forced, "Profile chosen");

    // Generator
    let channel = config.generator.channel;
    let awaiter = generator_running(session.events(), channel, &profile.id, config.timeouts.generator_start());
    session.start_generator(channel, &profile).await?;
    let status = awaiter
        .await?
        .ok_or(ScenarioError::Timeout("the generator to start"))?;

    let source_addresses = status.source_addresses();
    writeln!(output, "{}", serde_json::to_string(&source_addresses)?)?;

    let first_rx_rate = if session.has_event_feed() {
        let entry = generator_status(session.events(), config.timeouts.sfp_status()).await?;
        let rate = entry.and_then(|e| e.sfps_telemetry.into_iter().next().map(|t| t.rx_rate));
        writeln!(output, "{}", serde_json::to_string(&rate)?)?;
        rate
    } else {
        None
    };

    // Link
    let sfp_telemetry = sfp_rates(
        session.events(),
        config.rate_conditions.0.clone(),
        config.timeouts.min_rate(),
    )
    .await?
    .ok_or(ScenarioError::Timeout("the minimum rate"))?;
    info!(sfps = sfp_telemetry.len(), "Minimum rate reached");

    // Capture
    let capture = if options.capture {
        Some(capture(session, config, options).await?)
    } else {
        None
    };

    Ok(RunReport {
        profile_id: profile.id,
        source_addresses,
        first_rx_rate,
        sfp_telemetry,
        capture,
    })
}

async fn capture<S>(session: &S, config: &ScenarioConfig, options: &RunOptions) -> Result<CaptureJob, ScenarioError>
where
    S: ApplianceSession + ?Sized,
{
    if options.select_source {
        let connector = &config.connector;
        session
            .select_source(&connector.kind, connector.index, &connector.source)
            .await?;
    }

    let job = config.capture_job();
    let awaiter = capture_finished(session.events(), &job.id, config.timeouts.capture());
    session.start_capture(&job).await?;
    let finished = awaiter
        .await?
        .ok_or(ScenarioError::Timeout("the capture to complete"))?;

    if finished.state != CaptureJobState::Completed {
        return Err(ScenarioError::CaptureFailed(finished.state));
    }
    let has_analysis = finished
        .result
        .as_ref()
        .is_some_and(|r| r.analysis.is_some());
    if !has_analysis {
        return Err(ScenarioError::PcapMissing);
    }

    info!(
        job = %finished.id,
        pcap = finished.result.as_ref().and_then(|r| r.pcap_id.as_deref()).unwrap_or("-"),
        "Capture completed"
    );
    Ok(finished)
}

/// Print `"{n}\t: {description}"` per profile, numbered from 1.
pub fn list_profiles<W: Write>(profiles: &[GeneratorProfile], output: &mut W) -> std::io::Result<()> {
    for (i, profile) in profiles.iter().enumerate() {
        writeln!(output, "{}\t: {}", i + 1, profile.description())?;
    }
    Ok(())
}

/// Turn a 1-based answer into an index into `available` profiles.
pub fn profile_index(answer: &str, available: usize) -> Result<usize, ScenarioError> {
    let invalid = || ScenarioError::InvalidProfileSelection {
        input: answer.trim().to_string(),
        available,
    };
    let number: usize = answer.trim().parse().map_err(|_| invalid())?;
    if number == 0 || number > available {
        return Err(invalid());
    }
    Ok(number - 1)
}

async fn prompt<R, W>(input: &mut R, output: &mut W, question: &str) -> Result<String, ScenarioError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).await?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_index() {
        assert_eq!(profile_index("1", 3).unwrap(), 0);
        assert_eq!(profile_index(" 3\n", 3).unwrap(), 2);
        assert!(profile_index("0", 3).is_err());
        assert!(profile_index("4", 3).is_err());
        assert!(profile_index("two", 3).is_err());
        assert!(profile_index("", 3).is_err());
        assert!(profile_index("1", 0).is_err());
    }

    #[test]
    fn test_invalid_selection_message() {
        let err = profile_index("9\n", 2).unwrap_err();
        assert_eq!(err.to_string(), "Invalid profile selection '9' (expected 1..=2)");
    }

    #[test]
    fn test_list_profiles_format() {
        let profiles: Vec<GeneratorProfile> = serde_json::from_value(json!([
            { "id": "a", "meta": { "description": "1080p59.94" } },
            { "id": "b", "meta": { "description": "720p50" } }
        ]))
        .unwrap();
        let mut out = Vec::new();

        list_profiles(&profiles, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "1\t: 1080p59.94\n2\t: 720p50\n");
    }

    #[tokio::test]
    async fn test_prompt_reads_one_line() {
        let mut input: &[u8] = b"2\nleftover\n";
        let mut out = Vec::new();

        let answer = prompt(&mut input, &mut out, "Choose a profile: ").await.unwrap();

        assert_eq!(answer, "2\n");
        assert_eq!(out, b"Choose a profile: ");
    }
}
