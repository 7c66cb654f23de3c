//! Scenario runs against an in-process fake appliance.
//!
//! The clock is paused, so every timeout below resolves instantly in virtual
//! time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use shared_bus::{EventPublisher, EventSubscriber, InMemoryEventBus};
use shared_types::{
    events, CaptureConfiguration, CaptureJobState, ConnectorSource, GeneratorChannelId, GeneratorProfile,
    GenlockConfig, GenlockState, WsMessage,
};
use tokio::task::JoinHandle;
use vero_client::ClientError;

use gen_capture::{gen_capture_pcap, ApplianceSession, RunOptions, ScenarioConfig, ScenarioError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CaptureBehavior {
    Completes,
    CompletesWithoutAnalysis,
    Fails,
    Silent,
}

struct FakeAppliance {
    bus: Arc<InMemoryEventBus>,
    feed: bool,
    generator_responds: bool,
    sfp_a_rate: Value,
    sfp_b_rate: Value,
    capture_behavior: CaptureBehavior,
    calls: Mutex<Vec<String>>,
    started_profile: Mutex<Option<GeneratorProfile>>,
    capture_job: Mutex<Option<CaptureConfiguration>>,
    telemetry_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    close_count: AtomicUsize,
}

impl FakeAppliance {
    fn new() -> Self {
        Self {
            bus: Arc::new(InMemoryEventBus::new()),
            feed: true,
            generator_responds: true,
            sfp_a_rate: json!(1_250_000),
            sfp_b_rate: json!(900_000_000),
            capture_behavior: CaptureBehavior::Completes,
            calls: Mutex::new(Vec::new()),
            started_profile: Mutex::new(None),
            capture_job: Mutex::new(None),
            telemetry_task: Mutex::new(None),
            closed: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn telemetry(&self) -> Value {
        json!({
            "channel": "channel1",
            "sfps_telemetry": [
                { "sfp": "SFP A", "rx_rate": self.sfp_a_rate, "tx_rate": 0 },
                { "sfp": "SFP B", "rx_rate": self.sfp_b_rate, "tx_rate": 0 }
            ]
        })
    }
}

#[async_trait]
impl ApplianceSession for FakeAppliance {
    fn events(&self) -> &dyn EventSubscriber {
        self.bus.as_ref()
    }

    fn has_event_feed(&self) -> bool {
        self.feed
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.record(format!("login {username}/{password}"));
        Ok(())
    }

    async fn set_genlock_sync(&self, config: &GenlockConfig, _timeout: Duration) -> Result<GenlockState, ClientError> {
        self.record("genlock");
        Ok(GenlockState {
            family: config.family,
            locked: true,
        })
    }

    async fn profiles(&self) -> Result<Vec<GeneratorProfile>, ClientError> {
        self.record("profiles");
        Ok(serde_json::from_value(json!([
            {
                "id": "p-hd",
                "meta": { "description": "1080p59.94" },
                "senders": {
                    "video": [{ "network": { "useRedundancy": false } }],
                    "audio": [{ "network": { "useRedundancy": false } }]
                }
            },
            {
                "id": "p-uhd",
                "meta": { "description": "2160p59.94" },
                "senders": { "anc": [{ "network": {} }] }
            }
        ]))
        .unwrap())
    }

    async fn start_generator(&self, channel: GeneratorChannelId, profile: &GeneratorProfile) -> Result<(), ClientError> {
        self.record(format!("start {channel} {}", profile.id));
        *self.started_profile.lock().unwrap() = Some(profile.clone());

        if self.generator_responds {
            let running = json!({
                "channel": channel,
                "profileId": profile.id,
                "status": {
                    "video": [{ "network": {
                        "primary": { "destAddr": "239.1.1.1", "destPort": 5000 },
                        "secondary": { "destAddr": "239.2.1.1", "destPort": 5000 }
                    } }],
                    "audio": [{ "network": { "primary": { "destAddr": "239.1.1.2", "destPort": 5002 } } }],
                    "anc": []
                },
                "sfps_telemetry": []
            });
            self.bus
                .publish(WsMessage::new(events::GENERATOR_STATUS, vec![running]))
                .await;
        }

        if self.feed {
            let bus = self.bus.clone();
            let report = self.telemetry();
            let task = tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(500));
                for _ in 0..40 {
                    interval.tick().await;
                    bus.publish(WsMessage::new(events::GENERATOR_STATUS, vec![report.clone()]))
                        .await;
                }
            });
            *self.telemetry_task.lock().unwrap() = Some(task);
        }
        Ok(())
    }

    async fn select_source(&self, kind: &str, index: usize, source: &ConnectorSource) -> Result<(), ClientError> {
        self.record(format!("select {kind} {index} {}", source.source.meta.name));
        Ok(())
    }

    async fn start_capture(&self, config: &CaptureConfiguration) -> Result<(), ClientError> {
        self.record("capture");
        *self.capture_job.lock().unwrap() = Some(config.clone());

        let job = match self.capture_behavior {
            CaptureBehavior::Silent => return Ok(()),
            CaptureBehavior::Completes => json!({
                "id": config.id,
                "state": "completed",
                "result": { "pcapId": "pcap-1", "analysis": { "id": "a-1" } }
            }),
            CaptureBehavior::CompletesWithoutAnalysis => json!({
                "id": config.id,
                "state": "completed",
                "result": { "pcapId": "pcap-1" }
            }),
            CaptureBehavior::Fails => json!({ "id": config.id, "state": "failed" }),
        };

        // Another job finishing first must not satisfy the wait.
        self.bus
            .publish(WsMessage::new(
                events::CAPTURE_JOB_STATE,
                vec![json!({ "id": "someone-else", "state": "completed" })],
            ))
            .await;
        self.bus
            .publish(WsMessage::new(
                events::CAPTURE_JOB_STATE,
                vec![json!({ "id": config.id, "state": "running" })],
            ))
            .await;
        self.bus
            .publish(WsMessage::new(events::CAPTURE_JOB_STATE, vec![job]))
            .await;
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_count.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.telemetry_task.lock().unwrap().take() {
            task.abort();
        }
    }
}

fn options(profile: Option<usize>) -> RunOptions {
    RunOptions {
        profile,
        ..RunOptions::default()
    }
}

async fn run(fake: &FakeAppliance, options: &RunOptions, stdin: &str) -> (Result<gen_capture::RunReport, ScenarioError>, String) {
    let mut input = stdin.as_bytes();
    let mut output = Vec::new();
    let result = gen_capture_pcap(fake, &ScenarioConfig::default(), options, &mut input, &mut output).await;
    (result, String::from_utf8(output).unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_success_without_capture() {
    let fake = FakeAppliance::new();

    let (result, output) = run(&fake, &options(Some(1)), "").await;
    let report = result.unwrap();

    assert_eq!(report.profile_id, "p-hd");
    assert_eq!(report.source_addresses.len(), 2);
    assert_eq!(report.first_rx_rate, Some(1_250_000.into()));
    assert_eq!(report.sfp_telemetry.len(), 2);
    assert!(report.capture.is_none());

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "1\t: 1080p59.94");
    assert_eq!(lines[1], "2\t: 2160p59.94");
    let addresses: Value = serde_json::from_str(lines[2]).unwrap();
    assert_eq!(
        addresses,
        json!([
            {
                "primary": { "multicastAddress": "239.1.1.1", "destinationPort": 5000 },
                "secondary": { "multicastAddress": "239.2.1.1", "destinationPort": 5000 }
            },
            {
                "primary": { "multicastAddress": "239.1.1.2", "destinationPort": 5002 },
                "secondary": {}
            }
        ])
    );
    assert_eq!(lines[3], "1250000");

    assert_eq!(
        fake.calls(),
        vec!["login user/user", "genlock", "profiles", "start channel1 p-hd"]
    );
    assert_eq!(fake.close_count.load(Ordering::SeqCst), 1);
    assert_eq!(fake.bus.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fractional_link_rates() {
    let mut fake = FakeAppliance::new();
    fake.sfp_a_rate = json!(1250000.25);
    fake.sfp_b_rate = json!(700000000.5);

    let (result, output) = run(&fake, &options(Some(1)), "").await;
    let report = result.unwrap();

    assert_eq!(report.source_addresses.len(), 2);
    assert_eq!(report.first_rx_rate.and_then(|r| r.as_f64()), Some(1_250_000.25));
    assert_eq!(report.sfp_telemetry[1].rx_bps(), 700_000_000.5);
    assert_eq!(output.lines().nth(3), Some("1250000.25"));
}

#[tokio::test(start_paused = true)]
async fn test_started_profile_has_redundancy_forced() {
    let fake = FakeAppliance::new();

    run(&fake, &options(Some(1)), "").await.0.unwrap();

    let started = fake.started_profile.lock().unwrap().clone().unwrap();
    let body = serde_json::to_value(&started).unwrap();
    assert_eq!(body["senders"]["video"][0]["network"]["useRedundancy"], json!(true));
    assert_eq!(body["senders"]["audio"][0]["network"]["useRedundancy"], json!(true));
}

#[tokio::test(start_paused = true)]
async fn test_profile_chosen_interactively() {
    let fake = FakeAppliance::new();

    let (result, output) = run(&fake, &options(None), "2\n").await;

    assert_eq!(result.unwrap().profile_id, "p-uhd");
    assert!(output.contains("Choose a profile: "));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_profile_choice() {
    let fake = FakeAppliance::new();

    let (result, _) = run(&fake, &options(None), "7\n").await;

    assert!(matches!(
        result,
        Err(ScenarioError::InvalidProfileSelection { available: 2, .. })
    ));
    assert!(!fake.calls().iter().any(|c| c.starts_with("start")));
    assert!(fake.closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_profile_prompt_at_end_of_input() {
    let fake = FakeAppliance::new();

    let (result, _) = run(&fake, &options(None), "").await;

    assert!(matches!(result, Err(ScenarioError::InvalidProfileSelection { .. })));
    assert!(fake.closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_generator_timeout() {
    let mut fake = FakeAppliance::new();
    fake.generator_responds = false;
    fake.feed = false;

    let started = tokio::time::Instant::now();
    let (result, _) = run(&fake, &options(Some(1)), "").await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Timeout waiting for the generator to start");
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert!(fake.closed.load(Ordering::SeqCst));
    assert_eq!(fake.bus.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_minimum_rate_timeout() {
    let mut fake = FakeAppliance::new();
    fake.sfp_b_rate = json!(100_000_000);

    let (result, output) = run(&fake, &options(Some(1)), "").await;

    assert_eq!(
        result.unwrap_err().to_string(),
        "Timeout waiting for the minimum rate"
    );
    // The status line is still printed before the rate wait.
    assert!(output.lines().any(|l| l == "1250000"));
    assert!(fake.closed.load(Ordering::SeqCst));
    assert_eq!(fake.bus.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_without_feed_skips_status_line_and_times_out() {
    let mut fake = FakeAppliance::new();
    fake.feed = false;

    let (result, output) = run(&fake, &options(Some(1)), "").await;

    assert!(matches!(result, Err(ScenarioError::Timeout("the minimum rate"))));
    assert_eq!(output.lines().count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_capture_completes() {
    let fake = FakeAppliance::new();
    let options = RunOptions {
        capture: true,
        ..options(Some(1))
    };

    let (result, _) = run(&fake, &options, "").await;
    let report = result.unwrap();

    let job = report.capture.unwrap();
    assert_eq!(job.state, CaptureJobState::Completed);
    let submitted = fake.capture_job.lock().unwrap().clone().unwrap();
    assert_eq!(job.id, submitted.id);
    assert_eq!(submitted.name, "Capture test script");
    assert_eq!(submitted.duration, 200);
    assert!(submitted.sfp_a_enabled && submitted.sfp_b_enabled && submitted.enable_list_analysis);
    assert!(!fake.calls().iter().any(|c| c.starts_with("select")));
}

#[tokio::test(start_paused = true)]
async fn test_capture_with_source_selection() {
    let fake = FakeAppliance::new();
    let options = RunOptions {
        capture: true,
        select_source: true,
        ..options(Some(1))
    };

    run(&fake, &options, "").await.0.unwrap();

    let calls = fake.calls();
    let select = calls.iter().position(|c| c == "select video 0 Video #1").unwrap();
    let capture = calls.iter().position(|c| c == "capture").unwrap();
    assert!(select < capture);
}

#[tokio::test(start_paused = true)]
async fn test_capture_failed() {
    let mut fake = FakeAppliance::new();
    fake.capture_behavior = CaptureBehavior::Fails;
    let options = RunOptions {
        capture: true,
        ..options(Some(1))
    };

    let (result, _) = run(&fake, &options, "").await;

    let err = result.unwrap_err();
    assert!(matches!(err, ScenarioError::CaptureFailed(CaptureJobState::Failed)));
    assert_eq!(err.to_string(), "Capture failed");
    assert!(fake.closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_capture_without_analysis() {
    let mut fake = FakeAppliance::new();
    fake.capture_behavior = CaptureBehavior::CompletesWithoutAnalysis;
    let options = RunOptions {
        capture: true,
        ..options(Some(1))
    };

    let (result, _) = run(&fake, &options, "").await;

    assert!(matches!(result, Err(ScenarioError::PcapMissing)));
    assert!(fake.closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_capture_timeout() {
    let mut fake = FakeAppliance::new();
    fake.capture_behavior = CaptureBehavior::Silent;
    let options = RunOptions {
        capture: true,
        ..options(Some(1))
    };

    let (result, _) = run(&fake, &options, "").await;

    assert_eq!(
        result.unwrap_err().to_string(),
        "Timeout waiting for the capture to complete"
    );
    assert_eq!(fake.close_count.load(Ordering::SeqCst), 1);
    assert_eq!(fake.bus.listener_count(), 0);
}
