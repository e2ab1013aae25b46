// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package-info repository lifecycle.
//!
//! The __repository__ is a directory of generated package-info artifacts,
//! one or more per active port. Portkeep owns this directory completely:
//! a synchronization pass either populates it from scratch or reconciles
//! it in place against the catalog, and a collection pass sweeps out
//! artifacts that no longer belong to any active port.
//!
//! # Synchronization Modes
//!
//! When the repository directory exists and is non-empty, synchronization
//! runs in __update__ mode: artifacts are refreshed in place, guided by
//! two freshness checks (skip marker vs. recipe, artifact vs. recipe)
//! that keep the expensive recipe parser out of the loop when nothing has
//! changed. Otherwise __populate__ mode stages a complete replacement
//! directory next to the live one and swaps it in with a single rename,
//! so an interrupted populate never leaves a half-written repository
//! behind.
//!
//! # Staleness
//!
//! Exactly one version per port name may have artifacts in the repository
//! after a pass. Whatever falls outside that rule (artifacts of vanished
//! recipes, of broken recipes, of superseded versions) is removed, and
//! the built packages belonging to those artifacts are relocated into an
//! obsolete holding area rather than deleted. Skip markers and the
//! holding area are plain filesystem state, which keeps every pass
//! idempotent: a crash mid-update converges on the next run.

pub mod skip;
mod stale;
mod sync;

use crate::{
    catalog::Catalog,
    port::{PortOps, RecipeOps},
};

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Directory of skip markers inside the repository.
pub const SKIPPED_DIR: &str = ".skipped";

/// Suffix of the staging directory used by populate mode.
pub const STAGING_SUFFIX: &str = ".new";

/// A package-info repository tied to one recipe tree.
#[derive(Debug)]
pub struct Repository<O = RecipeOps>
where
    O: PortOps,
{
    pub(crate) path: PathBuf,
    pub(crate) packages_path: PathBuf,
    pub(crate) allow_untested: bool,
    pub(crate) quiet: bool,
    pub(crate) ops: O,
}

impl<O> Repository<O>
where
    O: PortOps,
{
    /// Construct new repository handle.
    ///
    /// Nothing is touched on disk until a synchronization pass runs.
    pub fn new(
        path: impl Into<PathBuf>,
        packages_path: impl Into<PathBuf>,
        allow_untested: bool,
        quiet: bool,
        ops: O,
    ) -> Self {
        Self {
            path: path.into(),
            packages_path: packages_path.into(),
            allow_untested,
            quiet,
            ops,
        }
    }

    /// Location of the live repository directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the built packages directory.
    pub fn packages_path(&self) -> &Path {
        &self.packages_path
    }

    /// Per-port operations backing this repository.
    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// Synchronize the repository against the catalog.
    ///
    /// Selects update mode when the repository directory exists and is
    /// non-empty, populate mode otherwise. Update mode finishes with a
    /// stale-collection pass over the surviving artifacts.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError`] if a filesystem precondition fails. Broken
    ///   or ineligible recipes never fail a pass; they are recorded in
    ///   the report instead.
    pub fn synchronize(&self, catalog: &Catalog, preserve_flags: bool) -> Result<SyncReport> {
        if self.exists_non_empty()? {
            let mut report = self.update(catalog)?;
            report.stale_removed = self.purge_stale(catalog, &report.broken)?;
            Ok(report)
        } else {
            self.populate(catalog, preserve_flags)
        }
    }

    pub(crate) fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(STAGING_SUFFIX);
        PathBuf::from(staging)
    }

    fn exists_non_empty(&self) -> Result<bool> {
        if !self.path.is_dir() {
            return Ok(false);
        }

        let mut entries = fs::read_dir(&self.path).map_err(|err| RepoError::Scan {
            source: err,
            path: self.path.clone(),
        })?;

        Ok(entries.next().is_some())
    }
}

/// Mode a synchronization pass ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Repository was built from scratch through a staging directory.
    Populate,

    /// Repository was reconciled in place.
    Update,
}

/// Outcome of one synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Mode the pass ran in.
    pub mode: SyncMode,

    /// Port-IDs whose package-infos were written this pass.
    pub written: Vec<String>,

    /// Port-IDs skipped as broken or ineligible this pass.
    pub skipped: Vec<String>,

    /// Port-IDs whose recipe broke while their artifact is still present.
    pub broken: Vec<String>,

    /// Package specifications of stale artifacts removed by collection.
    pub stale_removed: Vec<String>,
}

impl SyncReport {
    pub(crate) fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            written: Vec::new(),
            skipped: Vec::new(),
            broken: Vec::new(),
            stale_removed: Vec::new(),
        }
    }
}

// Modification time of a file that may be absent.
pub(crate) fn file_mtime(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => meta
            .modified()
            .map(Some)
            .map_err(|err| RepoError::Scan {
                source: err,
                path: path.to_path_buf(),
            }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(RepoError::Scan {
            source: err,
            path: path.to_path_buf(),
        }),
    }
}

/// Repository synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Per-port operation fails outside of recipe parsing.
    #[error(transparent)]
    Port(#[from] crate::port::PortError),

    /// Skip marker bookkeeping fails.
    #[error(transparent)]
    Skip(#[from] skip::SkipError),

    /// Staging directory cannot be prepared.
    #[error("failed to stage repository at {:?}", path.display())]
    Stage {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Staged repository cannot replace the live one.
    #[error("failed to commit staged repository to {:?}", path.display())]
    Commit {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Repository contents cannot be inspected.
    #[error("failed to scan repository at {:?}", path.display())]
    Scan {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Stale package-info cannot be removed.
    #[error("failed to remove stale package info at {:?}", path.display())]
    RemoveStale {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = RepoError> = std::result::Result<T, E>;
