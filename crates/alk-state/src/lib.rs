//! alk-state
//!
//! Durable local state for the reconciler: the cycle checkpoint and the
//! in-flight remediation registry.
//!
//! # Invariants
//!
//! - **Crash-safe writes**: every persisted value is written to a temp file
//!   in the same directory and renamed over the target. A crash between
//!   writes never leaves a corrupt or partial value on disk.
//! - **No in-memory-only state**: a mutation that fails to persist is rolled
//!   back in memory before the error is returned, so memory and disk never
//!   diverge past an error boundary.
//! - **Single writer**: both stores are touched only by the reconciler
//!   task; there is no cross-operation locking.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

mod checkpoint;
mod registry;

pub use checkpoint::{CheckpointStore, CHECKPOINT_SENTINEL};
pub use registry::InFlightRegistry;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failure to read or write persisted reconciler state.
///
/// Fatal for the cycle that hits it: the reconciler abandons the cycle
/// rather than continue with state it cannot persist.
#[derive(Debug)]
pub enum StateStoreError {
    /// Filesystem failure against the named store file.
    Io { path: PathBuf, source: io::Error },
    /// The store file exists but its contents are not valid.
    Corrupt { path: PathBuf, detail: String },
}

impl fmt::Display for StateStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateStoreError::Io { path, source } => {
                write!(f, "state store io error at {}: {}", path.display(), source)
            }
            StateStoreError::Corrupt { path, detail } => {
                write!(f, "state store corrupt at {}: {}", path.display(), detail)
            }
        }
    }
}

impl std::error::Error for StateStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StateStoreError::Io { source, .. } => Some(source),
            StateStoreError::Corrupt { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared write primitive
// ---------------------------------------------------------------------------

/// Atomically replace `path` with `contents` (temp file + rename).
///
/// The temp file lives next to the target so the rename stays on one
/// filesystem. A stale `.tmp` from an earlier crash is simply overwritten.
pub(crate) fn atomic_replace(path: &Path, contents: &str) -> Result<(), StateStoreError> {
    let io_err = |source: io::Error| StateStoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
