//! alk-reconcile
//!
//! Reconciliation core: one polling cycle over the platform event feed.
//!
//! Architectural decisions:
//! - One cycle at a time; the scheduler never overlaps cycles
//! - Checkpoint advances only after a cycle fully processes its events
//! - At most one active remediation per host (in-flight registry)
//! - Action issuance failure is step-level: logged, never cycle-fatal
//! - Feed and state failures abandon the cycle with the checkpoint untouched
//!
//! Remote boundaries are traits so the engine is testable without a live
//! platform or mail relay.

mod boundary;
mod engine;

pub use boundary::{ActionError, AlertNotifier, EventFeed, FeedError, RemediationActuator};
pub use engine::{CycleError, CycleOutcome, Reconciler};
