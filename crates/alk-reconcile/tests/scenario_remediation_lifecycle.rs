//! Scenario: Remediation lifecycle across trigger and terminal events
//!
//! # Invariants under test
//!
//! 1. A trigger event for a host with no in-flight remediation issues
//!    start-scan, then start-isolation, then exactly one alert, and records
//!    the host in the registry.
//! 2. Further trigger events for that host — within the same batch or in a
//!    later cycle — issue nothing (duplicate suppression).
//! 3. A clean terminal event lifts isolation, clears the registry entry,
//!    and sends no alert.
//! 4. A detections terminal event alerts, clears the registry entry, and
//!    deliberately leaves isolation active.
//! 5. Registry mutations made earlier in a batch affect later events in the
//!    same batch (trigger followed by its own terminal event in one cycle).
//!
//! All tests are pure in-process; stores live in a temp dir, boundaries are
//! recording mocks.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use alk_events::{Event, HostRecord, TriggerSet, EVENT_SCAN_CLEAN, EVENT_SCAN_DETECTIONS};
use alk_reconcile::{
    ActionError, AlertNotifier, EventFeed, FeedError, Reconciler, RemediationActuator,
};
use alk_state::{CheckpointStore, InFlightRegistry};

const TRIGGER: &str = "Win.Malware.Generic";

// ---------------------------------------------------------------------------
// Mock boundaries
// ---------------------------------------------------------------------------

struct ScriptedFeed {
    batches: Mutex<VecDeque<Result<Vec<Event>, FeedError>>>,
}

impl ScriptedFeed {
    fn new(batches: Vec<Result<Vec<Event>, FeedError>>) -> Self {
        Self {
            batches: Mutex::new(batches.into_iter().collect()),
        }
    }
}

#[async_trait::async_trait]
impl EventFeed for ScriptedFeed {
    async fn fetch_all(&self) -> Result<Vec<Event>, FeedError> {
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct RecordingActuator {
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl RemediationActuator for RecordingActuator {
    async fn start_scan(&self, guid: &str) -> Result<(), ActionError> {
        self.calls.lock().unwrap().push(format!("start_scan:{guid}"));
        Ok(())
    }

    async fn start_isolation(&self, guid: &str) -> Result<(), ActionError> {
        self.calls.lock().unwrap().push(format!("start_isolation:{guid}"));
        Ok(())
    }

    async fn stop_isolation(&self, guid: &str) -> Result<(), ActionError> {
        self.calls.lock().unwrap().push(format!("stop_isolation:{guid}"));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    /// (subject, hostname) per delivered alert.
    notes: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn notify(&self, subject: &str, host: &HostRecord) -> Result<(), ActionError> {
        self.notes
            .lock()
            .unwrap()
            .push((subject.to_string(), host.hostname.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ev(ts: i64, event_type: &str, guid: &str) -> Event {
    Event {
        timestamp: ts,
        event_type: event_type.to_string(),
        connector_guid: guid.to_string(),
        computer: HostRecord::new(format!("host-{guid}")),
    }
}

fn reconciler(
    dir: &Path,
    batches: Vec<Result<Vec<Event>, FeedError>>,
) -> Reconciler<ScriptedFeed, RecordingActuator, RecordingNotifier> {
    Reconciler {
        feed: ScriptedFeed::new(batches),
        actuator: RecordingActuator::default(),
        notifier: RecordingNotifier::default(),
        checkpoint: CheckpointStore::new(dir.join("last_cycle_ts")),
        registry: InFlightRegistry::open(dir.join("inflight_hosts")).unwrap(),
        triggers: TriggerSet::from_iter([TRIGGER.to_string()]),
    }
}

// ---------------------------------------------------------------------------
// 1. Trigger starts the full workflow exactly once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_starts_scan_isolation_and_alert() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = reconciler(dir.path(), vec![Ok(vec![ev(100, TRIGGER, "A")])]);
    rec.checkpoint.write(50).unwrap();

    let outcome = rec.run_cycle(500).await.unwrap();

    assert_eq!(
        *rec.actuator.calls.lock().unwrap(),
        vec!["start_scan:A", "start_isolation:A"],
        "scan must be issued before isolation"
    );

    let notes = rec.notifier.notes.lock().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, "Starting Full Scan - Win.Malware.Generic");
    assert_eq!(notes[0].1, "host-A");
    drop(notes);

    assert!(rec.registry.contains("A"));
    assert_eq!(rec.checkpoint.read().unwrap(), 500, "checkpoint advances to cycle time");

    assert_eq!(outcome.events_fetched, 1);
    assert_eq!(outcome.events_in_window, 1);
    assert_eq!(outcome.remediations_started, 1);
    assert_eq!(outcome.duplicates_suppressed, 0);
    assert_eq!(outcome.action_failures, 0);
    assert_eq!(outcome.window_start, 50);
    assert_eq!(outcome.window_end, 500);
}

// ---------------------------------------------------------------------------
// 2. Duplicate suppression, within a batch and across cycles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeat_triggers_in_one_batch_start_remediation_once_per_host() {
    let dir = tempfile::tempdir().unwrap();
    let batch = vec![
        ev(100, TRIGGER, "A"),
        ev(101, TRIGGER, "A"),
        ev(102, TRIGGER, "B"),
        ev(103, TRIGGER, "A"),
    ];
    let mut rec = reconciler(dir.path(), vec![Ok(batch)]);
    rec.checkpoint.write(50).unwrap();

    let outcome = rec.run_cycle(500).await.unwrap();

    assert_eq!(
        *rec.actuator.calls.lock().unwrap(),
        vec![
            "start_scan:A",
            "start_isolation:A",
            "start_scan:B",
            "start_isolation:B",
        ]
    );
    assert_eq!(rec.notifier.notes.lock().unwrap().len(), 2);
    assert_eq!(outcome.remediations_started, 2);
    assert_eq!(outcome.duplicates_suppressed, 2);
}

#[tokio::test]
async fn trigger_for_host_already_in_flight_issues_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = reconciler(dir.path(), vec![Ok(vec![ev(300, TRIGGER, "A")])]);
    rec.checkpoint.write(50).unwrap();
    rec.registry.add("A").unwrap();

    let outcome = rec.run_cycle(500).await.unwrap();

    assert!(rec.actuator.calls.lock().unwrap().is_empty());
    assert!(rec.notifier.notes.lock().unwrap().is_empty());
    assert!(rec.registry.contains("A"), "registry unchanged");
    assert_eq!(outcome.remediations_started, 0);
    assert_eq!(outcome.duplicates_suppressed, 1);
}

// ---------------------------------------------------------------------------
// 3. Clean terminal: isolation lifted, no alert
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_terminal_lifts_isolation_without_alert() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = reconciler(
        dir.path(),
        vec![
            Ok(vec![ev(100, TRIGGER, "A")]),
            Ok(vec![ev(200, EVENT_SCAN_CLEAN, "A")]),
        ],
    );
    rec.checkpoint.write(50).unwrap();

    rec.run_cycle(150).await.unwrap();
    assert!(rec.registry.contains("A"));

    let outcome = rec.run_cycle(250).await.unwrap();

    let calls = rec.actuator.calls.lock().unwrap();
    assert_eq!(calls.last().map(String::as_str), Some("stop_isolation:A"));
    drop(calls);

    // Only the cycle-one trigger alert; no alert for the clean outcome.
    assert_eq!(rec.notifier.notes.lock().unwrap().len(), 1);
    assert!(!rec.registry.contains("A"));
    assert_eq!(rec.checkpoint.read().unwrap(), 250);
    assert_eq!(outcome.cleared_clean, 1);
    assert_eq!(outcome.cleared_detections, 0);
}

// ---------------------------------------------------------------------------
// 4. Detections terminal: alert sent, isolation kept
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detections_terminal_alerts_and_keeps_isolation() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = reconciler(
        dir.path(),
        vec![
            Ok(vec![ev(100, TRIGGER, "A")]),
            Ok(vec![ev(200, EVENT_SCAN_DETECTIONS, "A")]),
        ],
    );
    rec.checkpoint.write(50).unwrap();

    rec.run_cycle(150).await.unwrap();
    let outcome = rec.run_cycle(250).await.unwrap();

    let calls = rec.actuator.calls.lock().unwrap();
    assert!(
        !calls.iter().any(|c| c.starts_with("stop_isolation")),
        "isolation must stay active pending operator action, got {calls:?}"
    );
    drop(calls);

    let notes = rec.notifier.notes.lock().unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].0, "Scan Completed With Detections");
    assert_eq!(notes[1].1, "host-A");
    drop(notes);

    assert!(!rec.registry.contains("A"), "episode is closed");
    assert_eq!(outcome.cleared_detections, 1);
}

// ---------------------------------------------------------------------------
// 5. In-batch ordering effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_then_own_terminal_in_same_batch_starts_then_clears() {
    let dir = tempfile::tempdir().unwrap();
    let batch = vec![ev(100, TRIGGER, "A"), ev(110, EVENT_SCAN_CLEAN, "A")];
    let mut rec = reconciler(dir.path(), vec![Ok(batch)]);
    rec.checkpoint.write(50).unwrap();

    let outcome = rec.run_cycle(500).await.unwrap();

    assert_eq!(
        *rec.actuator.calls.lock().unwrap(),
        vec!["start_scan:A", "start_isolation:A", "stop_isolation:A"]
    );
    assert!(!rec.registry.contains("A"));
    assert_eq!(outcome.remediations_started, 1);
    assert_eq!(outcome.cleared_clean, 1);
}

#[tokio::test]
async fn terminal_for_host_never_registered_still_issues_stop_isolation() {
    // First cycle after a registry loss, or a scan started out-of-band:
    // the clean terminal still lifts isolation and remove() is a no-op.
    let dir = tempfile::tempdir().unwrap();
    let mut rec = reconciler(dir.path(), vec![Ok(vec![ev(200, EVENT_SCAN_CLEAN, "A")])]);
    rec.checkpoint.write(50).unwrap();

    let outcome = rec.run_cycle(500).await.unwrap();

    assert_eq!(*rec.actuator.calls.lock().unwrap(), vec!["stop_isolation:A"]);
    assert!(rec.registry.is_empty());
    assert_eq!(outcome.cleared_clean, 1);
}

#[tokio::test]
async fn ignored_event_types_produce_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let batch = vec![ev(100, "Policy Update", "A"), ev(110, "Install Started", "B")];
    let mut rec = reconciler(dir.path(), vec![Ok(batch)]);
    rec.checkpoint.write(50).unwrap();

    let outcome = rec.run_cycle(500).await.unwrap();

    assert!(rec.actuator.calls.lock().unwrap().is_empty());
    assert!(rec.notifier.notes.lock().unwrap().is_empty());
    assert!(rec.registry.is_empty());
    assert_eq!(outcome.events_in_window, 2);
    assert_eq!(outcome.remediations_started, 0);
}
