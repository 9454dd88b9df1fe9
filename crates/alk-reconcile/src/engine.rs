//! The reconciliation cycle engine.

use std::fmt;

use tracing::{debug, warn};
use uuid::Uuid;

use alk_events::{classify, Disposition, TriggerSet, EVENT_SCAN_DETECTIONS};
use alk_state::{CheckpointStore, InFlightRegistry, StateStoreError};

use crate::boundary::{AlertNotifier, EventFeed, FeedError, RemediationActuator};

// ---------------------------------------------------------------------------
// Cycle result types
// ---------------------------------------------------------------------------

/// Summary of one completed reconciliation cycle (for structured logging).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub cycle_id: Uuid,
    /// Checkpoint before the cycle; events at or below it were skipped.
    pub window_start: i64,
    /// Checkpoint written after the cycle.
    pub window_end: i64,
    pub events_fetched: usize,
    pub events_in_window: usize,
    pub remediations_started: usize,
    pub duplicates_suppressed: usize,
    /// Terminal "no detections" events processed (isolation lifted).
    pub cleared_clean: usize,
    /// Terminal "with detections" events processed (isolation kept).
    pub cleared_detections: usize,
    /// Remediation commands or alerts whose issuance failed.
    pub action_failures: usize,
}

/// Fatal-for-the-cycle error. The checkpoint is never advanced on either
/// variant; the next scheduled cycle retries the identical window.
#[derive(Debug)]
pub enum CycleError {
    Feed(FeedError),
    State(StateStoreError),
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleError::Feed(e) => write!(f, "cycle abandoned, feed failure: {e}"),
            CycleError::State(e) => write!(f, "cycle abandoned, state store failure: {e}"),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CycleError::Feed(e) => Some(e),
            CycleError::State(e) => Some(e),
        }
    }
}

impl From<FeedError> for CycleError {
    fn from(e: FeedError) -> Self {
        CycleError::Feed(e)
    }
}

impl From<StateStoreError> for CycleError {
    fn from(e: StateStoreError) -> Self {
        CycleError::State(e)
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Owns the durable stores and the remote boundaries for the lifetime of
/// the daemon; the scheduler drives [`Reconciler::run_cycle`] on its
/// interval and never overlaps invocations.
pub struct Reconciler<F, A, N> {
    pub feed: F,
    pub actuator: A,
    pub notifier: N,
    pub checkpoint: CheckpointStore,
    pub registry: InFlightRegistry,
    pub triggers: TriggerSet,
}

impl<F, A, N> Reconciler<F, A, N>
where
    F: EventFeed,
    A: RemediationActuator,
    N: AlertNotifier,
{
    /// Execute one reconciliation cycle.
    ///
    /// `now_ts` is wall-clock seconds captured once by the caller at cycle
    /// start; it becomes the checkpoint if the cycle completes. Injecting it
    /// keeps the engine deterministic under test.
    ///
    /// Events are processed sequentially in arrival order: a registry
    /// mutation made for an earlier event affects classification of a later
    /// event for the same host within the same batch.
    pub async fn run_cycle(&mut self, now_ts: i64) -> Result<CycleOutcome, CycleError> {
        let cycle_id = Uuid::new_v4();
        let last = self.checkpoint.read()?;
        let events = self.feed.fetch_all().await?;

        let mut outcome = CycleOutcome {
            cycle_id,
            window_start: last,
            window_end: last,
            events_fetched: events.len(),
            events_in_window: 0,
            remediations_started: 0,
            duplicates_suppressed: 0,
            cleared_clean: 0,
            cleared_detections: 0,
            action_failures: 0,
        };

        for event in &events {
            // Strict greater-than: events exactly at the checkpoint were
            // processed by the cycle that wrote it.
            if event.timestamp <= last {
                continue;
            }
            outcome.events_in_window += 1;

            let guid = event.connector_guid.as_str();
            match classify(&event.event_type, &self.triggers) {
                Disposition::Trigger => {
                    if self.registry.contains(guid) {
                        debug!(
                            %cycle_id,
                            guid,
                            event_type = %event.event_type,
                            "remediation already in flight, suppressing duplicate"
                        );
                        outcome.duplicates_suppressed += 1;
                        continue;
                    }

                    if let Err(e) = self.actuator.start_scan(guid).await {
                        warn!(%cycle_id, guid, error = %e, "start_scan issuance failed");
                        outcome.action_failures += 1;
                    }
                    if let Err(e) = self.actuator.start_isolation(guid).await {
                        warn!(%cycle_id, guid, error = %e, "start_isolation issuance failed");
                        outcome.action_failures += 1;
                    }
                    let subject = format!("Starting Full Scan - {}", event.event_type);
                    if let Err(e) = self.notifier.notify(&subject, &event.computer).await {
                        warn!(%cycle_id, guid, error = %e, "alert delivery failed");
                        outcome.action_failures += 1;
                    }

                    // Registered even when issuance failed above: the episode
                    // was attempted, and re-triggering every cycle on a flaky
                    // actuator would storm the platform.
                    self.registry.add(guid)?;
                    outcome.remediations_started += 1;
                }
                Disposition::ScanClean => {
                    if let Err(e) = self.actuator.stop_isolation(guid).await {
                        warn!(%cycle_id, guid, error = %e, "stop_isolation issuance failed");
                        outcome.action_failures += 1;
                    }
                    self.registry.remove(guid)?;
                    outcome.cleared_clean += 1;
                }
                Disposition::ScanDetections => {
                    // Isolation stays active: detections were found and the
                    // host awaits manual operator action.
                    if let Err(e) = self.notifier.notify(EVENT_SCAN_DETECTIONS, &event.computer).await {
                        warn!(%cycle_id, guid, error = %e, "alert delivery failed");
                        outcome.action_failures += 1;
                    }
                    self.registry.remove(guid)?;
                    outcome.cleared_detections += 1;
                }
                Disposition::Ignored => {}
            }
        }

        // max() keeps the checkpoint non-decreasing across a backwards
        // wall-clock step.
        let advanced = now_ts.max(last);
        self.checkpoint.write(advanced)?;
        outcome.window_end = advanced;

        Ok(outcome)
    }
}
