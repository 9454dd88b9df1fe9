//! Remote boundaries of the reconciler: event feed, remediation actuator,
//! alert notifier.
//!
//! All three are opaque remote collaborators. The actuator and notifier are
//! fire-and-forget: an `Ok` means the command or message was *issued*, not
//! that remediation completed — completion is only ever observed later as a
//! terminal event on the feed. Implementations must not conflate the two.

use std::fmt;

use alk_events::{Event, HostRecord};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failure to fetch or decode the event batch.
///
/// Cycle-level: the reconciler abandons the whole cycle without advancing
/// the checkpoint, so the next cycle retries the identical window.
#[derive(Debug)]
pub enum FeedError {
    /// Network or transport failure (includes timeouts).
    Transport(String),
    /// The platform returned a non-success HTTP status.
    Api { status: u16, message: String },
    /// The response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Transport(msg) => write!(f, "feed transport error: {msg}"),
            FeedError::Api { status, message } => {
                write!(f, "feed api error status={status}: {message}")
            }
            FeedError::Decode(msg) => write!(f, "feed decode error: {msg}"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Failure to issue a remediation command or deliver an alert.
///
/// Step-level: logged by the engine, which continues with the remaining
/// events; the registry mutation for the event is still applied
/// (at-least-attempted, not exactly-once).
#[derive(Debug)]
pub enum ActionError {
    /// Network or transport failure (includes timeouts).
    Transport(String),
    /// The remote endpoint rejected the command.
    Api { status: u16, message: String },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Transport(msg) => write!(f, "action transport error: {msg}"),
            ActionError::Api { status, message } => {
                write!(f, "action api error status={status}: {message}")
            }
        }
    }
}

impl std::error::Error for ActionError {}

// ---------------------------------------------------------------------------
// Boundary traits
// ---------------------------------------------------------------------------

/// Read side: the platform's event feed.
#[async_trait::async_trait]
pub trait EventFeed: Send + Sync {
    /// Fetch the full current event batch. No server-side filtering and no
    /// ordering guarantee is assumed; the reconciler windows and classifies.
    async fn fetch_all(&self) -> Result<Vec<Event>, FeedError>;
}

/// Write side: per-host remediation commands against the platform.
///
/// `Ok` is issuance success only (see module docs).
#[async_trait::async_trait]
pub trait RemediationActuator: Send + Sync {
    async fn start_scan(&self, guid: &str) -> Result<(), ActionError>;

    async fn start_isolation(&self, guid: &str) -> Result<(), ActionError>;

    /// Lift network isolation. Takes the connector GUID directly.
    async fn stop_isolation(&self, guid: &str) -> Result<(), ActionError>;
}

/// Operator alert sink.
#[async_trait::async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Deliver one alert about `host` to the configured recipients.
    async fn notify(&self, subject: &str, host: &HostRecord) -> Result<(), ActionError>;
}
