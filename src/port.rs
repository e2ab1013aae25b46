// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Port domain representation.
//!
//! A __port__ is a named, versioned buildable unit described by a single
//! recipe file inside the recipe tree. The tree nests two levels deep:
//! category directories contain port group directories, which contain one
//! recipe file per version, named `<name>-<version>.recipe`.
//!
//! # Port Identity
//!
//! A port is identified by its __port-ID__, the name and version joined
//! with a dash. The port-ID is always derived from the descriptor's
//! components on demand, and doubles as the package specification of the
//! port's primary package. Sub-packages extend the name with an
//! underscore-delimited suffix, so the package-info for the "docs"
//! sub-package of `foo-1.2` is named `foo_docs-1.2`.
//!
//! # Port Operations
//!
//! Everything the synchronizer needs to do to a single port goes through
//! the [`PortOps`] seam: parsing the recipe, evaluating its status on the
//! target architecture, writing and removing package-infos, relocating
//! built packages, and flag bookkeeping. The production implementation is
//! [`RecipeOps`]; tests wrap it to observe which operations actually run.

use crate::recipe::{PackageInfo, Recipe, RecipeError, RecipeStatus};

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info, instrument};

/// File suffix of recipe sources.
pub const RECIPE_SUFFIX: &str = ".recipe";

/// File suffix of generated package-info artifacts.
pub const PACKAGE_INFO_SUFFIX: &str = ".pkginfo";

/// File suffix of built package files.
pub const PACKAGE_SUFFIX: &str = ".pkg";

/// Holding area for relocated stale packages, under the packages directory.
pub const OBSOLETE_DIR: &str = ".obsolete";

/// Flag requesting a forced rebuild of a port.
pub const BUILD_FLAG: &str = "build";

/// One recipe at one version.
///
/// Descriptors are created during catalog construction and never mutated
/// afterwards; mutable port state (flags) lives on disk next to the recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Port name.
    pub name: String,

    /// Port version.
    pub version: String,

    /// Name of the category directory the recipe lives under.
    pub category: String,

    /// Location of the recipe source file.
    pub recipe_path: PathBuf,
}

impl PortDescriptor {
    /// Construct new port descriptor.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        category: impl Into<String>,
        recipe_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            category: category.into(),
            recipe_path: recipe_path.into(),
        }
    }

    /// Identity key, derived from name and version.
    pub fn port_id(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// File name of the primary package-info artifact.
    pub fn package_info_name(&self) -> String {
        format!("{}{}", self.port_id(), PACKAGE_INFO_SUFFIX)
    }

    /// Package specification strings this port emits, primary first.
    pub fn package_specs(&self, recipe: &Recipe) -> Vec<String> {
        let mut specs = vec![self.port_id()];
        for sub in &recipe.subpackages {
            specs.push(format!("{}_{}-{}", self.name, sub, self.version));
        }

        specs
    }

    /// Modification time of the recipe source.
    ///
    /// # Errors
    ///
    /// - Return [`PortError::Inspect`] if the recipe cannot be inspected.
    pub fn recipe_mtime(&self) -> Result<SystemTime> {
        fs::metadata(&self.recipe_path)
            .and_then(|meta| meta.modified())
            .map_err(|err| PortError::Inspect {
                source: err,
                path: self.recipe_path.clone(),
            })
    }

    // Hidden file beside the recipe, so the catalog scan never sees it.
    fn flag_path(&self, flag: &str) -> PathBuf {
        let dir = self.recipe_path.parent().unwrap_or(Path::new("."));
        dir.join(format!(".{}.{}", self.port_id(), flag))
    }
}

/// Layer of indirection for per-port operations.
///
/// The synchronizer treats parsing and status evaluation as expensive, so
/// everything it does to a single port funnels through this trait.
pub trait PortOps {
    /// Parse the port's recipe source.
    ///
    /// A failure here is the recoverable "recipe is broken" signal the
    /// synchronizer converts into a skip marker; it never aborts a pass.
    fn parse(&self, port: &PortDescriptor, strict: bool) -> Result<Recipe, RecipeError>;

    /// Evaluate the recipe's build status on the target architecture.
    fn status_on_target(&self, recipe: &Recipe) -> RecipeStatus;

    /// Write the port's package-info artifact(s) into a target directory.
    fn write_package_infos(
        &self,
        port: &PortDescriptor,
        recipe: &Recipe,
        dir: &Path,
    ) -> Result<()>;

    /// Remove the port's package-info artifact(s) from a target directory.
    fn remove_package_infos(
        &self,
        port: &PortDescriptor,
        recipe: &Recipe,
        dir: &Path,
    ) -> Result<()>;

    /// Relocate the port's built packages into the obsolete holding area.
    fn obsolete_packages(
        &self,
        port: &PortDescriptor,
        recipe: &Recipe,
        packages_dir: &Path,
    ) -> Result<Vec<String>>;

    /// Check whether a named flag is set on the port.
    fn check_flag(&self, port: &PortDescriptor, flag: &str) -> bool;

    /// Clear a named flag on the port. Clearing an unset flag is fine.
    fn clear_flag(&self, port: &PortDescriptor, flag: &str) -> Result<()>;
}

/// Port operations over TOML recipe files.
#[derive(Debug, Clone)]
pub struct RecipeOps {
    target_arch: String,
}

impl RecipeOps {
    /// Construct new recipe operations for a target architecture.
    pub fn new(target_arch: impl Into<String>) -> Self {
        Self {
            target_arch: target_arch.into(),
        }
    }
}

impl PortOps for RecipeOps {
    fn parse(&self, port: &PortDescriptor, strict: bool) -> Result<Recipe, RecipeError> {
        let contents =
            fs::read_to_string(&port.recipe_path).map_err(|err| RecipeError::Read {
                source: err,
                recipe_path: port.recipe_path.clone(),
            })?;
        let recipe: Recipe = contents.parse()?;
        if strict {
            recipe.validate_strict()?;
        }

        Ok(recipe)
    }

    fn status_on_target(&self, recipe: &Recipe) -> RecipeStatus {
        recipe.status_on(&self.target_arch)
    }

    #[instrument(skip(self, recipe, dir), level = "debug")]
    fn write_package_infos(
        &self,
        port: &PortDescriptor,
        recipe: &Recipe,
        dir: &Path,
    ) -> Result<()> {
        for spec in port.package_specs(recipe) {
            let name = spec
                .strip_suffix(&format!("-{}", port.version))
                .unwrap_or(spec.as_str())
                .to_string();
            let info = PackageInfo {
                name,
                version: port.version.clone(),
                summary: recipe.summary.clone(),
                source: port.port_id(),
            };

            let path = dir.join(format!("{spec}{PACKAGE_INFO_SUFFIX}"));
            debug!("writing package info {:?}", path.display());
            fs::write(&path, info.render()?).map_err(|err| PortError::WriteInfo {
                source: err,
                path: path.clone(),
            })?;
        }

        Ok(())
    }

    #[instrument(skip(self, recipe, dir), level = "debug")]
    fn remove_package_infos(
        &self,
        port: &PortDescriptor,
        recipe: &Recipe,
        dir: &Path,
    ) -> Result<()> {
        for spec in port.package_specs(recipe) {
            let path = dir.join(format!("{spec}{PACKAGE_INFO_SUFFIX}"));
            match fs::remove_file(&path) {
                Ok(()) => debug!("removed package info {:?}", path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(PortError::RemoveInfo { source: err, path });
                }
            }
        }

        Ok(())
    }

    fn obsolete_packages(
        &self,
        port: &PortDescriptor,
        recipe: &Recipe,
        packages_dir: &Path,
    ) -> Result<Vec<String>> {
        let mut moved = Vec::new();
        for spec in port.package_specs(recipe) {
            moved.extend(relocate_packages(packages_dir, &spec)?);
        }

        Ok(moved)
    }

    fn check_flag(&self, port: &PortDescriptor, flag: &str) -> bool {
        port.flag_path(flag).is_file()
    }

    fn clear_flag(&self, port: &PortDescriptor, flag: &str) -> Result<()> {
        let path = port.flag_path(flag);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PortError::ClearFlag { source: err, path }),
        }
    }
}

/// Move every built package matching a package specification into the
/// obsolete holding area under the packages directory.
///
/// Packages are renamed, never deleted; the holding area is created lazily
/// on the first relocation. Returns the file names that were moved.
///
/// # Errors
///
/// - Return [`PortError::PackagePattern`] if the match pattern is invalid.
/// - Return [`PortError::Relocate`] if a package cannot be moved.
pub fn relocate_packages(packages_dir: &Path, package_spec: &str) -> Result<Vec<String>> {
    let pattern = format!(
        "{}/{}-*{}",
        packages_dir.display(),
        package_spec,
        PACKAGE_SUFFIX
    );
    let matches = glob::glob(&pattern).map_err(|err| PortError::PackagePattern {
        source: err,
        pattern: pattern.clone(),
    })?;

    let obsolete_dir = packages_dir.join(OBSOLETE_DIR);
    let mut moved = Vec::new();
    for entry in matches {
        let package = entry.map_err(|err| {
            let path = err.path().to_path_buf();
            PortError::Inspect {
                source: err.into_error(),
                path,
            }
        })?;
        let Some(file_name) = package.file_name().map(ToOwned::to_owned) else {
            continue;
        };

        if moved.is_empty() {
            mkdirp::mkdirp(&obsolete_dir).map_err(|err| PortError::Relocate {
                source: err,
                path: obsolete_dir.clone(),
            })?;
        }

        info!("obsoleting package {:?}", file_name);
        fs::rename(&package, obsolete_dir.join(&file_name)).map_err(|err| {
            PortError::Relocate {
                source: err,
                path: package.clone(),
            }
        })?;
        moved.push(file_name.to_string_lossy().into_owned());
    }

    Ok(moved)
}

/// Port operation error types.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Recipe handling fails.
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    /// File metadata cannot be inspected.
    #[error("failed to inspect {:?}", path.display())]
    Inspect {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Package-info cannot be written.
    #[error("failed to write package info at {:?}", path.display())]
    WriteInfo {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Package-info cannot be removed.
    #[error("failed to remove package info at {:?}", path.display())]
    RemoveInfo {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Package match pattern is invalid.
    #[error("invalid package pattern {pattern:?}")]
    PackagePattern {
        #[source]
        source: glob::PatternError,
        pattern: String,
    },

    /// Built package cannot be relocated.
    #[error("failed to relocate package at {:?}", path.display())]
    Relocate {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Flag marker cannot be cleared.
    #[error("failed to clear flag at {:?}", path.display())]
    ClearFlag {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PortError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn descriptor() -> PortDescriptor {
        PortDescriptor::new("foo", "1.2", "dev-tools", "/tree/dev-tools/foo/foo-1.2.recipe")
    }

    fn recipe(subpackages: &[&str]) -> Recipe {
        Recipe {
            summary: "blah".into(),
            description: None,
            subpackages: subpackages.iter().map(ToString::to_string).collect(),
            architectures: [("x86_64".into(), RecipeStatus::Stable)].into_iter().collect(),
        }
    }

    #[test]
    fn port_id_is_derived() {
        let port = descriptor();
        assert_eq!(port.port_id(), "foo-1.2");
        assert_eq!(port.package_info_name(), "foo-1.2.pkginfo");
    }

    #[test]
    fn package_specs_include_subpackages() {
        let port = descriptor();
        let specs = port.package_specs(&recipe(&["devel", "docs"]));
        assert_eq!(specs, vec!["foo-1.2", "foo_devel-1.2", "foo_docs-1.2"]);
    }

    #[test]
    fn write_and_remove_package_infos() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let port = descriptor();
        let recipe = recipe(&["devel"]);
        let ops = RecipeOps::new("x86_64");

        ops.write_package_infos(&port, &recipe, scratch.path())?;
        assert!(scratch.path().join("foo-1.2.pkginfo").is_file());
        assert!(scratch.path().join("foo_devel-1.2.pkginfo").is_file());

        ops.remove_package_infos(&port, &recipe, scratch.path())?;
        assert!(!scratch.path().join("foo-1.2.pkginfo").exists());
        assert!(!scratch.path().join("foo_devel-1.2.pkginfo").exists());

        // Removing infos that are already gone stays quiet.
        ops.remove_package_infos(&port, &recipe, scratch.path())?;

        Ok(())
    }

    #[test]
    fn relocate_packages_moves_matches_only() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        fs::write(scratch.path().join("foo-1.2-x86_64.pkg"), "built")?;
        fs::write(scratch.path().join("foo-1.2-source.pkg"), "src")?;
        fs::write(scratch.path().join("bar-1.2-x86_64.pkg"), "other")?;

        let mut moved = relocate_packages(scratch.path(), "foo-1.2")?;
        moved.sort();
        assert_eq!(moved, vec!["foo-1.2-source.pkg", "foo-1.2-x86_64.pkg"]);

        let obsolete = scratch.path().join(OBSOLETE_DIR);
        assert_eq!(
            fs::read_to_string(obsolete.join("foo-1.2-x86_64.pkg"))?,
            "built"
        );
        assert!(!scratch.path().join("foo-1.2-x86_64.pkg").exists());
        assert!(scratch.path().join("bar-1.2-x86_64.pkg").exists());

        Ok(())
    }

    #[test]
    fn relocate_packages_without_matches_is_noop() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let moved = relocate_packages(scratch.path(), "ghost-1.0")?;
        assert!(moved.is_empty());
        assert!(!scratch.path().join(OBSOLETE_DIR).exists());

        Ok(())
    }

    #[test]
    fn flags_check_and_clear() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let recipe_path = scratch.path().join("foo-1.2.recipe");
        fs::write(&recipe_path, "")?;
        let port = PortDescriptor::new("foo", "1.2", "dev-tools", &recipe_path);
        let ops = RecipeOps::new("x86_64");

        assert!(!ops.check_flag(&port, BUILD_FLAG));
        fs::write(scratch.path().join(".foo-1.2.build"), "")?;
        assert!(ops.check_flag(&port, BUILD_FLAG));

        ops.clear_flag(&port, BUILD_FLAG)?;
        assert!(!ops.check_flag(&port, BUILD_FLAG));

        // Clearing twice stays quiet.
        ops.clear_flag(&port, BUILD_FLAG)?;

        Ok(())
    }
}
