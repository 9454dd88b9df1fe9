//! Fixed-interval scheduler around the reconciler.
//!
//! # Invariants
//!
//! - Cycles never overlap: the next cycle starts only after the previous
//!   one returned, success or failure, plus the full sleep interval.
//! - A cycle failure is logged and the loop continues; the checkpoint was
//!   left untouched by the failed cycle, so the next cycle retries the
//!   identical window. Nothing here terminates the process.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use alk_reconcile::{AlertNotifier, CycleError, EventFeed, Reconciler, RemediationActuator};

/// Run reconciliation cycles forever, sleeping `interval` between cycle
/// completions.
pub async fn run_forever<F, A, N>(mut rec: Reconciler<F, A, N>, interval: Duration)
where
    F: EventFeed,
    A: RemediationActuator,
    N: AlertNotifier,
{
    loop {
        run_one(&mut rec).await;
        tokio::time::sleep(interval).await;
    }
}

/// Run exactly one cycle, logging its outcome. Returns whether the cycle
/// succeeded.
pub async fn run_one<F, A, N>(rec: &mut Reconciler<F, A, N>) -> bool
where
    F: EventFeed,
    A: RemediationActuator,
    N: AlertNotifier,
{
    // Wall-clock captured once per cycle; the whole cycle windows against
    // this single snapshot.
    let now_ts = Utc::now().timestamp();

    match rec.run_cycle(now_ts).await {
        Ok(outcome) => {
            info!(
                cycle_id = %outcome.cycle_id,
                window_start = outcome.window_start,
                window_end = outcome.window_end,
                events_fetched = outcome.events_fetched,
                events_in_window = outcome.events_in_window,
                remediations_started = outcome.remediations_started,
                duplicates_suppressed = outcome.duplicates_suppressed,
                cleared_clean = outcome.cleared_clean,
                cleared_detections = outcome.cleared_detections,
                action_failures = outcome.action_failures,
                "reconcile cycle complete"
            );
            true
        }
        Err(CycleError::Feed(e)) => {
            warn!(error = %e, "cycle abandoned: event fetch failed; window will be retried");
            false
        }
        Err(CycleError::State(e)) => {
            error!(error = %e, "cycle abandoned: state store failure; window will be retried");
            false
        }
    }
}
