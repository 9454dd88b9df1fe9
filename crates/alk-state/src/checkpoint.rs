//! Cycle checkpoint: the timestamp boundary below which all feed events are
//! considered already processed.
//!
//! # Invariants
//!
//! - First-ever `read` durably creates the store with [`CHECKPOINT_SENTINEL`]
//!   so subsequent reads are consistent.
//! - The stored value is written only after a cycle has fully processed its
//!   events (write-after-process; the caller owns that ordering).
//! - A value that does not parse is surfaced as corruption, never silently
//!   reset — a reset would re-trigger remediation for old events.

use std::fs;
use std::path::PathBuf;

use crate::{atomic_replace, StateStoreError};

/// Sentinel returned (and persisted) on a never-initialized store.
///
/// An arbitrary historical epoch predating the platform's existence, so the
/// first run processes every event the feed still retains.
pub const CHECKPOINT_SENTINEL: i64 = 847_584_000;

/// Durable single-scalar store for the cycle checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the checkpoint, creating the store with the sentinel on first run.
    pub fn read(&self) -> Result<i64, StateStoreError> {
        if !self.path.exists() {
            self.write(CHECKPOINT_SENTINEL)?;
            return Ok(CHECKPOINT_SENTINEL);
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| StateStoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        raw.trim()
            .parse::<i64>()
            .map_err(|_| StateStoreError::Corrupt {
                path: self.path.clone(),
                detail: format!("not a unix timestamp: {:?}", raw.trim()),
            })
    }

    /// Durably replace the checkpoint (swap-and-replace, never in-place).
    pub fn write(&self, ts: i64) -> Result<(), StateStoreError> {
        atomic_replace(&self.path, &format!("{ts}\n"))
    }
}
