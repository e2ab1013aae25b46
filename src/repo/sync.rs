// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Synchronization passes.
//!
//! Populate builds the repository from scratch behind a staging directory;
//! update reconciles the live repository in place. Both walk each port
//! name's versions from highest to lowest and guarantee that at most one
//! version per name ends the pass with package-infos in the repository.

use crate::{
    catalog::Catalog,
    port::{PortOps, BUILD_FLAG},
    recipe::RecipeStatus,
    repo::{
        file_mtime,
        skip::{DirSkipLedger, SkipLedger},
        RepoError, Repository, Result, SyncMode, SyncReport, SKIPPED_DIR,
    },
};

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use tracing::{debug, info, instrument};

impl<O> Repository<O>
where
    O: PortOps,
{
    /// Build the repository from scratch.
    ///
    /// Every port name is walked from its highest version downwards; the
    /// first version that parses and is eligible on the target
    /// architecture gets its package-infos written, and lower versions
    /// are not even looked at. Everything is staged into a fresh
    /// directory that replaces the live one with a single rename at the
    /// very end, so the live repository stays untouched if the pass is
    /// interrupted.
    #[instrument(skip(self, catalog), level = "debug")]
    pub(crate) fn populate(&self, catalog: &Catalog, preserve_flags: bool) -> Result<SyncReport> {
        info!("populating repository at {:?}", self.path.display());

        let staging = self.staging_path();
        if staging.exists() {
            // Leftover staging from an interrupted run.
            fs::remove_dir_all(&staging).map_err(|err| RepoError::Stage {
                source: err,
                path: staging.clone(),
            })?;
        }
        fs::create_dir_all(staging.join(SKIPPED_DIR)).map_err(|err| RepoError::Stage {
            source: err,
            path: staging.clone(),
        })?;
        let ledger = DirSkipLedger::new(staging.join(SKIPPED_DIR));

        let mut report = SyncReport::new(SyncMode::Populate);
        let names = catalog.sorted_names();
        let bar = self.progress_bar(names.len())?;

        for name in names {
            bar.set_message(name.to_string());
            for version in catalog.versions(name).iter().rev() {
                let Some(port) = catalog.port(&format!("{name}-{version}")) else {
                    continue;
                };
                let port_id = port.port_id();

                let recipe = match self.ops.parse(port, false) {
                    Ok(recipe) => recipe,
                    Err(err) => {
                        debug!("recipe for {port_id} is broken: {err}");
                        ledger.mark(&port_id)?;
                        report.skipped.push(port_id);
                        continue;
                    }
                };

                let status = self.ops.status_on_target(&recipe);
                if !eligible(status, self.allow_untested) {
                    info!("{port_id} is skipped, as it is {status} on target architecture");
                    ledger.mark(&port_id)?;
                    report.skipped.push(port_id);
                    continue;
                }

                if self.ops.check_flag(port, BUILD_FLAG) && !preserve_flags {
                    info!("{port_id}: build flag reset");
                    self.ops.clear_flag(port, BUILD_FLAG)?;
                }
                self.ops.write_package_infos(port, &recipe, &staging)?;
                report.written.push(port_id);
                break;
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        // The live directory is absent or empty by mode selection, so the
        // swap is a remove of nothing plus one atomic rename.
        if self.path.exists() {
            fs::remove_dir_all(&self.path).map_err(|err| RepoError::Commit {
                source: err,
                path: self.path.clone(),
            })?;
        }
        fs::rename(&staging, &self.path).map_err(|err| RepoError::Commit {
            source: err,
            path: self.path.clone(),
        })?;

        Ok(report)
    }

    /// Reconcile the live repository in place.
    ///
    /// Two freshness checks keep the parser out of the loop: a skip
    /// marker at least as new as its recipe silences the version without
    /// re-parsing, and a primary artifact at least as new as its recipe
    /// confirms the version as active on the spot. Everything else is
    /// parsed again: superseded versions get their artifacts removed and
    /// their packages obsoleted, newly eligible versions get fresh
    /// artifacts, and recipes that broke while their artifact is still
    /// present are flagged for the collector.
    #[instrument(skip(self, catalog), level = "debug")]
    pub(crate) fn update(&self, catalog: &Catalog) -> Result<SyncReport> {
        info!("checking if any package infos need to be updated");

        let ledger = DirSkipLedger::new(self.path.join(SKIPPED_DIR));
        ledger.ensure()?;

        let mut report = SyncReport::new(SyncMode::Update);
        for name in catalog.sorted_names() {
            let mut higher_version_is_active = false;
            for version in catalog.versions(name).iter().rev() {
                let Some(port) = catalog.port(&format!("{name}-{version}")) else {
                    continue;
                };
                let port_id = port.port_id();
                let recipe_mtime = port.recipe_mtime()?;

                // Recipes skipped last time stay skipped until they change.
                if let Some(marked) = ledger.marked_at(&port_id)? {
                    if recipe_mtime <= marked {
                        report.skipped.push(port_id);
                        continue;
                    }
                }

                // A fresh artifact for the highest version pre-empts
                // everything below it.
                let info_path = self.path.join(port.package_info_name());
                let info_mtime = file_mtime(&info_path)?;
                if let Some(info_mtime) = info_mtime {
                    if !higher_version_is_active && recipe_mtime <= info_mtime {
                        higher_version_is_active = true;
                        break;
                    }
                }

                match self.ops.parse(port, false) {
                    Ok(recipe) => {
                        if higher_version_is_active {
                            if info_mtime.is_some() {
                                info!(
                                    "removing package infos for {port_id}, as newer version is active"
                                );
                                self.ops.remove_package_infos(port, &recipe, &self.path)?;
                                self.ops
                                    .obsolete_packages(port, &recipe, &self.packages_path)?;
                                break;
                            }
                            continue;
                        }

                        let status = self.ops.status_on_target(&recipe);
                        if !eligible(status, self.allow_untested) {
                            info!(
                                "{port_id} is still marked as {status} on target architecture"
                            );
                            ledger.mark(&port_id)?;
                            report.skipped.push(port_id);
                            continue;
                        }

                        higher_version_is_active = true;
                        ledger.clear(&port_id)?;
                        info!("updating package infos of {port_id}");
                        self.ops.write_package_infos(port, &recipe, &self.path)?;
                        report.written.push(port_id);
                    }
                    Err(err) => {
                        if !higher_version_is_active {
                            ledger.mark(&port_id)?;
                            if info_mtime.is_some() {
                                report.broken.push(port_id);
                            } else {
                                info!("recipe for {port_id} is still broken: {err}");
                                report.skipped.push(port_id);
                            }
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    fn progress_bar(&self, total: usize) -> Result<ProgressBar> {
        if self.quiet {
            return Ok(ProgressBar::hidden());
        }

        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<30}  [{wide_bar:.yellow/blue}] {pos}/{len}",
        )?
        .progress_chars("-Cco.");
        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);

        Ok(bar)
    }
}

fn eligible(status: RecipeStatus, allow_untested: bool) -> bool {
    status == RecipeStatus::Stable || (status == RecipeStatus::Untested && allow_untested)
}
