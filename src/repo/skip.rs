// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Skip marker bookkeeping.
//!
//! A __skip marker__ records that a port version was passed over during a
//! synchronization pass, either because its recipe does not parse or
//! because its status is ineligible on the target architecture. The marker
//! carries no content; its modification time is the whole signal. As long
//! as the marker is at least as new as the recipe, the port stays skipped
//! without re-parsing. Once the recipe changes, the marker goes stale and
//! the next pass retries the recipe.
//!
//! Marker storage sits behind the [`SkipLedger`] trait so the synchronizer
//! never touches the backing store directly; [`DirSkipLedger`] is the
//! plain-directory backend, one zero-byte file per port-ID.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Skip marker storage.
pub trait SkipLedger {
    /// When the port-ID was last marked, if it is marked at all.
    fn marked_at(&self, port_id: &str) -> Result<Option<SystemTime>>;

    /// Mark the port-ID as skipped, refreshing the timestamp if it is
    /// already marked.
    fn mark(&self, port_id: &str) -> Result<()>;

    /// Drop the mark for a port-ID. Clearing an unmarked port-ID is fine.
    fn clear(&self, port_id: &str) -> Result<()>;
}

/// Skip markers as zero-byte files in a directory.
#[derive(Debug, Clone)]
pub struct DirSkipLedger {
    dir: PathBuf,
}

impl DirSkipLedger {
    /// Construct new directory-backed ledger.
    ///
    /// The directory itself is not created until [`DirSkipLedger::ensure`]
    /// or the first mark.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the marker directory if it is missing.
    ///
    /// # Errors
    ///
    /// - Return [`SkipError::Prepare`] if the directory cannot be created.
    pub fn ensure(&self) -> Result<()> {
        mkdirp::mkdirp(&self.dir)
            .map(|_| ())
            .map_err(|err| SkipError::Prepare {
                source: err,
                marker_dir: self.dir.clone(),
            })
    }

    fn marker_path(&self, port_id: &str) -> PathBuf {
        self.dir.join(port_id)
    }
}

impl SkipLedger for DirSkipLedger {
    fn marked_at(&self, port_id: &str) -> Result<Option<SystemTime>> {
        let marker_path = self.marker_path(port_id);
        match fs::metadata(&marker_path) {
            Ok(meta) => meta.modified().map(Some).map_err(|err| SkipError::Inspect {
                source: err,
                marker_path,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SkipError::Inspect {
                source: err,
                marker_path,
            }),
        }
    }

    fn mark(&self, port_id: &str) -> Result<()> {
        let marker_path = self.marker_path(port_id);

        // INVARIANT: Touch semantics. Create the marker if missing,
        // refresh its modification time if present.
        let marker = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&marker_path)
            .map_err(|err| SkipError::Touch {
                source: err,
                marker_path: marker_path.clone(),
            })?;
        marker
            .set_modified(SystemTime::now())
            .map_err(|err| SkipError::Touch {
                source: err,
                marker_path,
            })
    }

    fn clear(&self, port_id: &str) -> Result<()> {
        let marker_path = self.marker_path(port_id);
        match fs::remove_file(&marker_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SkipError::Remove {
                source: err,
                marker_path,
            }),
        }
    }
}

/// Skip marker management error types.
#[derive(Debug, thiserror::Error)]
pub enum SkipError {
    /// Marker directory cannot be created when missing.
    #[error("failed to create marker directory at {:?}", marker_dir.display())]
    Prepare {
        #[source]
        source: std::io::Error,
        marker_dir: PathBuf,
    },

    /// Marker file cannot be touched.
    #[error("failed to touch marker at {:?}", marker_path.display())]
    Touch {
        #[source]
        source: std::io::Error,
        marker_path: PathBuf,
    },

    /// Marker file cannot be inspected.
    #[error("failed to inspect marker at {:?}", marker_path.display())]
    Inspect {
        #[source]
        source: std::io::Error,
        marker_path: PathBuf,
    },

    /// Marker file cannot be removed.
    #[error("failed to remove marker at {:?}", marker_path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        marker_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SkipError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_clear_roundtrip() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ledger = DirSkipLedger::new(scratch.path().join(".skipped"));
        ledger.ensure()?;

        assert_eq!(ledger.marked_at("foo-1.0")?, None);

        ledger.mark("foo-1.0")?;
        assert!(ledger.marked_at("foo-1.0")?.is_some());
        assert!(scratch.path().join(".skipped").join("foo-1.0").is_file());

        ledger.clear("foo-1.0")?;
        assert_eq!(ledger.marked_at("foo-1.0")?, None);

        // Clearing twice stays quiet.
        ledger.clear("foo-1.0")?;

        Ok(())
    }

    #[test]
    fn mark_refreshes_timestamp() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ledger = DirSkipLedger::new(scratch.path());

        ledger.mark("foo-1.0")?;
        let marker = scratch.path().join("foo-1.0");
        let stale = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        fs::File::options()
            .write(true)
            .open(&marker)?
            .set_modified(stale)?;
        assert_eq!(ledger.marked_at("foo-1.0")?, Some(stale));

        ledger.mark("foo-1.0")?;
        let refreshed = ledger.marked_at("foo-1.0")?.unwrap();
        assert!(refreshed > stale);

        Ok(())
    }

    #[test]
    fn ensure_is_idempotent() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let ledger = DirSkipLedger::new(scratch.path().join(".skipped"));
        ledger.ensure()?;
        ledger.ensure()?;
        assert!(scratch.path().join(".skipped").is_dir());

        Ok(())
    }
}
