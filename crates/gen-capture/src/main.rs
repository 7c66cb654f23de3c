//! `gen-capture` command line.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::io::BufReader;
use tracing::{debug, info};

use gen_capture::{gen_capture_pcap, RunOptions, ScenarioConfig, ScenarioError, VeroSession};
use vero_telemetry::{init_telemetry, TelemetryConfig};

/// Drive the signal generator and capture of a broadcast appliance.
#[derive(Parser, Debug)]
#[command(name = "gen-capture")]
#[command(about = "Run the generator and capture script")]
#[command(after_help = "Example: gen-capture gen-capture-pcap -b http://localhost")]
struct Args {
    /// Scenarios to run, in order, until one succeeds
    #[arg(value_enum, required = true)]
    commands: Vec<Command>,

    /// Name or IP address of the host
    #[arg(short = 'b', long)]
    address: String,

    /// The user
    #[arg(short, long, default_value = "user")]
    username: String,

    /// The password
    #[arg(short, long, default_value = "user")]
    password: String,

    /// Profile number to start (1-based); prompts when omitted
    #[arg(long)]
    profile: Option<usize>,

    /// Record a pcap once the minimum rate is reached
    #[arg(long)]
    capture: bool,

    /// Point the capture connector at the configured source first
    #[arg(long, requires = "capture")]
    select_source: bool,

    /// JSON file overriding timeouts, rate conditions and capture settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Run the generator and capture script
    GenCapturePcap,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig::from_env().verbose(args.verbose)).context("Failed to initialize logging")?;

    let config = match &args.config {
        Some(path) => ScenarioConfig::load(path).context("Failed to load scenario configuration")?,
        None => ScenarioConfig::default(),
    };

    let options = RunOptions {
        username: args.username.clone(),
        password: args.password.clone(),
        profile: args.profile,
        capture: args.capture,
        select_source: args.select_source,
    };

    for command in &args.commands {
        let result = match command {
            Command::GenCapturePcap => run_gen_capture_pcap(&args.address, &config, &options).await,
        };

        match result {
            Ok(()) => {
                info!(command = ?command, "Command succeeded");
                return Ok(ExitCode::SUCCESS);
            }
            Err(e) => report_failure(*command, &e, &mut std::io::stderr()),
        }
    }

    Ok(ExitCode::FAILURE)
}

/// Print a failed command once on stderr. The log only gets it at debug level.
fn report_failure<W: Write>(command: Command, error: &ScenarioError, stderr: &mut W) {
    debug!(command = ?command, error = %error, "Command failed");
    let _ = writeln!(stderr, "Error: {error}");
}

async fn run_gen_capture_pcap(address: &str, config: &ScenarioConfig, options: &RunOptions) -> Result<(), ScenarioError> {
    let session = VeroSession::connect(address)?;
    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();

    gen_capture_pcap(&session, config, options, &mut input, &mut output)
        .await
        .map(drop)
}
