// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Stale artifact collection.
//!
//! After an update pass the repository may still hold package-infos whose
//! recipe vanished from the tree, or whose recipe broke while the
//! artifact stayed behind. The collector sweeps those out: the
//! package-info is deleted, and every built package belonging to it is
//! relocated into the obsolete holding area. Built packages are never
//! deleted here.

use crate::{
    catalog::Catalog,
    port::{relocate_packages, PortOps, PACKAGE_INFO_SUFFIX},
    repo::{RepoError, Repository, Result},
};

use std::fs;
use tracing::{info, instrument};

impl<O> Repository<O>
where
    O: PortOps,
{
    /// Remove package-infos with no active owner.
    ///
    /// An artifact is stale when its package specification resolves to no
    /// port-ID in the catalog, or to a port-ID in the broken set. Stale
    /// artifacts are deleted; their built packages are relocated into the
    /// obsolete holding area. Returns the package specifications that
    /// were removed.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Scan`] if the repository cannot be read.
    /// - Return [`RepoError::RemoveStale`] if an artifact cannot be
    ///   deleted.
    /// - Return [`RepoError::Port`] if a package cannot be relocated.
    #[instrument(skip(self, catalog, broken), level = "debug")]
    pub fn purge_stale(&self, catalog: &Catalog, broken: &[String]) -> Result<Vec<String>> {
        info!("looking for stale package infos");

        let mut artifacts = Vec::new();
        let entries = fs::read_dir(&self.path).map_err(|err| RepoError::Scan {
            source: err,
            path: self.path.clone(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|err| RepoError::Scan {
                source: err,
                path: self.path.clone(),
            })?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(package_spec) = file_name.strip_suffix(PACKAGE_INFO_SUFFIX) {
                artifacts.push((package_spec.to_string(), entry.path()));
            }
        }
        artifacts.sort();

        let mut removed = Vec::new();
        for (package_spec, info_path) in artifacts {
            let resolved = catalog.resolve_port_id(&package_spec);
            let stale = match &resolved {
                None => true,
                Some(port_id) => broken.contains(port_id),
            };
            if !stale {
                continue;
            }

            info!("removing stale package info {package_spec}");
            fs::remove_file(&info_path).map_err(|err| RepoError::RemoveStale {
                source: err,
                path: info_path.clone(),
            })?;
            relocate_packages(&self.packages_path, &package_spec)?;
            removed.push(package_spec);
        }

        Ok(removed)
    }
}
