//! In-flight remediation registry: the set of connector GUIDs for which a
//! scan + isolation workflow has started and no terminal event has been
//! observed yet.
//!
//! Membership is held in a `BTreeSet` loaded at open; the file on disk is
//! one identifier per line, sorted, and rewritten atomically on every
//! mutation. The line format never leaks past this interface.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use crate::{atomic_replace, StateStoreError};

/// Durable set of host identifiers currently under remediation.
#[derive(Debug)]
pub struct InFlightRegistry {
    path: PathBuf,
    members: BTreeSet<String>,
}

impl InFlightRegistry {
    /// Open the registry, loading membership from disk.
    ///
    /// A missing file is an empty registry; the file is created by the
    /// first mutation. Blank lines are tolerated on load.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StateStoreError> {
        let path = path.into();

        let members = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| StateStoreError::Io {
                path: path.clone(),
                source,
            })?;
            raw.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            BTreeSet::new()
        };

        Ok(Self { path, members })
    }

    /// Is a remediation currently in flight for this host?
    pub fn contains(&self, guid: &str) -> bool {
        self.members.contains(guid)
    }

    /// Record a started remediation. Idempotent: adding a present id is a
    /// no-op and skips the disk write.
    pub fn add(&mut self, guid: &str) -> Result<(), StateStoreError> {
        if !self.members.insert(guid.to_string()) {
            return Ok(());
        }
        if let Err(e) = self.persist() {
            // Roll back so memory never runs ahead of disk.
            self.members.remove(guid);
            return Err(e);
        }
        Ok(())
    }

    /// Close out a remediation. Removing an absent id is a no-op, not an
    /// error, and skips the disk write.
    pub fn remove(&mut self, guid: &str) -> Result<(), StateStoreError> {
        if !self.members.remove(guid) {
            return Ok(());
        }
        if let Err(e) = self.persist() {
            self.members.insert(guid.to_string());
            return Err(e);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn persist(&self) -> Result<(), StateStoreError> {
        let mut contents = String::new();
        for guid in &self.members {
            contents.push_str(guid);
            contents.push('\n');
        }
        atomic_replace(&self.path, &contents)
    }
}
