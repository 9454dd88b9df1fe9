//! alk-events
//!
//! Event data model and classification for the airlock reconciler.
//!
//! Architectural decisions:
//! - Classification is exact string match on `event_type`
//! - The trigger set is supplied by configuration, never hard-coded
//! - Terminal event types are platform constants and close a remediation
//! - The host record is carried verbatim from the feed into alerts
//!
//! Deterministic, pure logic. No IO. No HTTP types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Terminal event type: scan finished and the host came back clean.
pub const EVENT_SCAN_CLEAN: &str = "Scan Completed, No Detections";

/// Terminal event type: scan finished and detections remain on the host.
pub const EVENT_SCAN_DETECTIONS: &str = "Scan Completed With Detections";

// ---------------------------------------------------------------------------
// Feed event model
// ---------------------------------------------------------------------------

/// Host record attached to every feed event.
///
/// Only `hostname` is interpreted; everything else the platform sends is
/// retained in `details` and rendered into alerts untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    pub hostname: String,

    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl HostRecord {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            details: Map::new(),
        }
    }
}

/// One event from the platform feed.
///
/// `timestamp` is epoch seconds; `connector_guid` is the stable host
/// identifier the in-flight registry is keyed by. Unknown top-level fields
/// in the feed payload are ignored on decode — the platform sends many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: i64,
    pub event_type: String,
    pub connector_guid: String,
    pub computer: HostRecord,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Configured set of event types that start the scan + isolation workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSet(BTreeSet<String>);

impl TriggerSet {
    pub fn from_iter(types: impl IntoIterator<Item = String>) -> Self {
        Self(types.into_iter().collect())
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.0.contains(event_type)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What the reconciler should do with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Member of the trigger set: start remediation unless one is in flight.
    Trigger,
    /// Scan finished clean: lift isolation and close the episode.
    ScanClean,
    /// Scan finished with detections: alert, close the episode, keep isolation.
    ScanDetections,
    /// Everything else.
    Ignored,
}

/// Classify one event type against the configured trigger set.
///
/// Trigger membership is checked first, so a deployment that lists a
/// terminal type as a trigger gets trigger semantics for it — the trigger
/// set is operator intent and wins.
pub fn classify(event_type: &str, triggers: &TriggerSet) -> Disposition {
    if triggers.contains(event_type) {
        Disposition::Trigger
    } else if event_type == EVENT_SCAN_CLEAN {
        Disposition::ScanClean
    } else if event_type == EVENT_SCAN_DETECTIONS {
        Disposition::ScanDetections
    } else {
        Disposition::Ignored
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
