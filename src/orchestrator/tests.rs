//! Unit tests for the conversion orchestrator, driven through the
//! deterministic simulated transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, TransportError, ValidationError};
use crate::orchestrator::ConversionOrchestrator;
use crate::transport::{SimulatedReply, SimulatedTransport, TransportReply};
use crate::types::{
    ArtifactUrl, ConversionOutcome, Event, FailureReason, FormatDescriptor, Progress, SelectedFile,
};

const FAST_TICK: Duration = Duration::from_millis(1);
const SLOW_TICK: Duration = Duration::from_secs(60);

fn orchestrator(transport: SimulatedTransport) -> ConversionOrchestrator {
    ConversionOrchestrator::new(&Config::default(), Arc::new(transport)).unwrap()
}

fn reply(status: u16, body: serde_json::Value) -> SimulatedReply {
    SimulatedReply::Reply(TransportReply {
        status,
        body: body.to_string().into_bytes(),
    })
}

fn progress_log() -> (Arc<Mutex<Vec<Progress>>>, impl FnMut(Progress) + Send + 'static) {
    let log: Arc<Mutex<Vec<Progress>>> = Arc::new(Mutex::new(Vec::new()));
    let log_in_cb = log.clone();
    (log, move |p| log_in_cb.lock().unwrap().push(p))
}

fn xlsx_file() -> SelectedFile {
    SelectedFile::new("report.xlsx", vec![0u8; 2048])
}

fn csv_format(orch: &ConversionOrchestrator) -> FormatDescriptor {
    orch.catalog().find("csv").cloned().unwrap()
}

fn percents(log: &Arc<Mutex<Vec<Progress>>>) -> Vec<u8> {
    log.lock().unwrap().iter().map(|p| p.percent).collect()
}

#[tokio::test]
async fn success_reports_monotonic_progress_ending_at_100_once() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK).with_result(
        reply(200, serde_json::json!({"url": "https://backend/artifacts/1"})),
    ));
    let (log, on_progress) = progress_log();

    let handle = orch.start(xlsx_file(), &csv_format(&orch), on_progress).unwrap();
    let outcome = handle.outcome().await;

    assert!(matches!(outcome, ConversionOutcome::Success(_)));
    let seen = percents(&log);
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "progress not increasing: {seen:?}");
    assert_eq!(seen.last().copied(), Some(100));
    assert_eq!(seen.iter().filter(|&&p| p == 100).count(), 1);
}

#[tokio::test]
async fn derived_filename_swaps_extension_when_server_omits_name() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK).with_result(
        reply(200, serde_json::json!({"url": "https://backend/artifacts/2"})),
    ));

    let outcome = orch
        .start(xlsx_file(), &csv_format(&orch), |_| {})
        .unwrap()
        .outcome()
        .await;

    let artifact = outcome.artifact().expect("expected success");
    assert_eq!(artifact.file_name, "report.csv");
    assert!(matches!(artifact.url, ArtifactUrl::Durable(_)));
}

#[tokio::test]
async fn server_supplied_filename_wins_over_derived() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK).with_result(
        reply(200, serde_json::json!({"url": "https://x/y", "fileName": "out.pdf"})),
    ));

    let outcome = orch
        .start(xlsx_file(), &csv_format(&orch), |_| {})
        .unwrap()
        .outcome()
        .await;

    let artifact = outcome.artifact().expect("expected success");
    assert_eq!(artifact.url.as_url().as_str(), "https://x/y");
    assert_eq!(artifact.file_name, "out.pdf");
}

#[tokio::test]
async fn temporary_flag_yields_transient_artifact_url() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK).with_result(
        reply(200, serde_json::json!({"url": "https://x/tmp/1", "temporary": true})),
    ));

    let outcome = orch
        .start(xlsx_file(), &csv_format(&orch), |_| {})
        .unwrap()
        .outcome()
        .await;

    let artifact = outcome.artifact().expect("expected success");
    assert!(artifact.url.is_transient());
}

#[tokio::test]
async fn server_error_status_maps_to_server_failure_with_terminal_progress() {
    let orch = orchestrator(
        SimulatedTransport::new()
            .with_tick(FAST_TICK)
            .with_result(reply(500, serde_json::json!({"error": "boom"}))),
    );
    let (log, on_progress) = progress_log();

    let outcome = orch
        .start(xlsx_file(), &csv_format(&orch), on_progress)
        .unwrap()
        .outcome()
        .await;

    assert_eq!(
        outcome.failure(),
        Some(&FailureReason::Server { code: 500 })
    );
    // Observers are told to stop animating even on failure.
    assert_eq!(percents(&log).last().copied(), Some(100));
}

#[tokio::test]
async fn success_status_without_any_url_field_is_malformed() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK).with_result(
        reply(200, serde_json::json!({"fileName": "out.pdf"})),
    ));

    let outcome = orch
        .start(xlsx_file(), &csv_format(&orch), |_| {})
        .unwrap()
        .outcome()
        .await;

    assert_eq!(outcome.failure(), Some(&FailureReason::MalformedResponse));
}

#[tokio::test]
async fn success_status_with_unparseable_body_is_malformed() {
    let orch = orchestrator(
        SimulatedTransport::new()
            .with_tick(FAST_TICK)
            .with_result(SimulatedReply::Reply(TransportReply {
                status: 200,
                body: b"<html>not json</html>".to_vec(),
            })),
    );

    let outcome = orch
        .start(xlsx_file(), &csv_format(&orch), |_| {})
        .unwrap()
        .outcome()
        .await;

    assert_eq!(outcome.failure(), Some(&FailureReason::MalformedResponse));
}

#[tokio::test]
async fn transport_failure_maps_to_network_with_terminal_progress() {
    let orch = orchestrator(
        SimulatedTransport::new()
            .with_tick(FAST_TICK)
            .with_result(SimulatedReply::Fail(TransportError::Timeout)),
    );
    let (log, on_progress) = progress_log();

    let outcome = orch
        .start(xlsx_file(), &csv_format(&orch), on_progress)
        .unwrap()
        .outcome()
        .await;

    assert!(matches!(
        outcome.failure(),
        Some(FailureReason::Network(_))
    ));
    assert_eq!(percents(&log).last().copied(), Some(100));
}

#[tokio::test]
async fn second_start_while_in_flight_is_rejected_as_busy() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(SLOW_TICK));

    let handle = orch.start(xlsx_file(), &csv_format(&orch), |_| {}).unwrap();
    assert!(!orch.is_idle());

    let second = orch.start(xlsx_file(), &csv_format(&orch), |_| {});
    assert!(matches!(second, Err(Error::Busy)));

    // The rejection must not disturb the in-flight request.
    handle.cancel();
    let outcome = handle.outcome().await;
    assert_eq!(outcome.failure(), Some(&FailureReason::Cancelled));
}

#[tokio::test]
async fn cancellation_settles_cancelled_with_no_further_progress() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(SLOW_TICK));
    let (log, on_progress) = progress_log();

    let handle = orch.start(xlsx_file(), &csv_format(&orch), on_progress).unwrap();
    handle.cancel();
    let outcome = handle.outcome().await;
    assert_eq!(outcome.failure(), Some(&FailureReason::Cancelled));

    let after_settle = percents(&log);
    assert!(
        !after_settle.contains(&100),
        "cancelled request must not emit terminal progress"
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(percents(&log), after_settle, "progress fired after cancellation");
}

#[tokio::test]
async fn cancel_after_settlement_is_a_noop() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK).with_result(
        reply(200, serde_json::json!({"url": "https://x/done"})),
    ));

    let handle = orch.start(xlsx_file(), &csv_format(&orch), |_| {}).unwrap();
    // Let the request settle before cancelling.
    while !orch.is_idle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    handle.cancel();
    let outcome = handle.outcome().await;
    assert!(matches!(outcome, ConversionOutcome::Success(_)));
}

#[tokio::test]
async fn session_returns_to_idle_and_accepts_a_new_start() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK).with_result(
        reply(200, serde_json::json!({"url": "https://x/one"})),
    ));

    let first = orch
        .start(xlsx_file(), &csv_format(&orch), |_| {})
        .unwrap()
        .outcome()
        .await;
    assert!(matches!(first, ConversionOutcome::Success(_)));
    assert!(orch.is_idle());

    let second = orch
        .start(xlsx_file(), &csv_format(&orch), |_| {})
        .unwrap()
        .outcome()
        .await;
    assert!(matches!(second, ConversionOutcome::Success(_)));
}

#[tokio::test]
async fn oversized_file_is_rejected_before_any_request_starts() {
    let mut config = Config::default();
    config.validation.max_file_size = 128;
    let orch =
        ConversionOrchestrator::new(&config, Arc::new(SimulatedTransport::new())).unwrap();

    let file = SelectedFile::new("big.xlsx", vec![0u8; 256]);
    let err = orch.start(file, &csv_format(&orch), |_| {}).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::TooLarge { size: 256, .. })
    ));
    assert!(orch.is_idle());
}

#[tokio::test]
async fn unknown_format_is_rejected() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK));
    let bogus = FormatDescriptor {
        id: "parquet".to_string(),
        name: "Parquet".to_string(),
        extension: ".parquet".to_string(),
        description: String::new(),
    };
    let err = orch.start(xlsx_file(), &bogus, |_| {}).unwrap_err();
    assert!(matches!(err, Error::UnknownFormat(id) if id == "parquet"));
    assert!(orch.is_idle());
}

#[tokio::test]
async fn lifecycle_events_are_broadcast() {
    let orch = orchestrator(SimulatedTransport::new().with_tick(FAST_TICK).with_result(
        reply(200, serde_json::json!({"url": "https://x/evt", "fileName": "evt.csv"})),
    ));
    let mut events = orch.subscribe();

    let outcome = orch
        .start(xlsx_file(), &csv_format(&orch), |_| {})
        .unwrap()
        .outcome()
        .await;
    assert!(matches!(outcome, ConversionOutcome::Success(_)));

    let mut saw_started = false;
    let mut saw_progress = false;
    let mut saw_completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::Started { format_id, .. } => {
                assert_eq!(format_id, "csv");
                saw_started = true;
            }
            Event::Progress { .. } => saw_progress = true,
            Event::Completed { file_name, .. } => {
                assert_eq!(file_name, "evt.csv");
                saw_completed = true;
            }
            Event::Failed { .. } => panic!("unexpected failure event"),
        }
    }
    assert!(saw_started && saw_progress && saw_completed);
}
