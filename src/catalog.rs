// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Port catalog construction.
//!
//! The catalog is the in-memory index of the recipe tree, built once per
//! run and frozen afterwards. It answers three questions: which ports
//! exist (keyed by port-ID), which versions a port name has (sorted
//! ascending), and which port a generated package specification belongs
//! to.
//!
//! # Tree Layout
//!
//! Only directories whose name contains at least one '-' count as
//! categories, and only their immediate subdirectories count as port
//! groups; hidden entries are ignored at both levels. A recipe file must
//! be named `<name>-<version>.recipe` with exactly one '-'. Anything
//! else is warned about and skipped, so a single stray file never sinks a
//! whole synchronization run.

use crate::{
    port::{PortDescriptor, RECIPE_SUFFIX},
    version::VersionOrder,
};

use regex::Regex;
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::warn;

/// Frozen index of the recipe tree.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    ports: BTreeMap<String, PortDescriptor>,
    versions: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    /// Build the catalog by scanning a recipe tree.
    ///
    /// Version lists are sorted ascending with the given comparator.
    /// Malformed recipe file names are warned about and skipped; a
    /// missing or unreadable tree root is fatal.
    ///
    /// # Errors
    ///
    /// - Return [`CatalogError::Scan`] if a tree directory cannot be read.
    pub fn build(tree_root: impl AsRef<Path>, order: &impl VersionOrder) -> Result<Self> {
        let tree_root = tree_root.as_ref();
        let mut ports = BTreeMap::new();
        let mut versions: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (category, category_path) in sorted_subdirs(tree_root)? {
            if category.starts_with('.') || !category.contains('-') {
                continue;
            }

            for (group, group_path) in sorted_subdirs(&category_path)? {
                if group.starts_with('.') {
                    continue;
                }

                for (file_name, recipe_path) in sorted_files(&group_path)? {
                    let Some(stem) = file_name.strip_suffix(RECIPE_SUFFIX) else {
                        continue;
                    };

                    let elements: Vec<&str> = stem.split('-').collect();
                    let [name, version] = elements.as_slice() else {
                        warn!("cannot parse port/version info: {file_name}");
                        continue;
                    };
                    if name.is_empty() || version.is_empty() {
                        warn!("cannot parse port/version info: {file_name}");
                        continue;
                    }

                    let port_id = format!("{name}-{version}");
                    if ports.contains_key(&port_id) {
                        warn!("duplicate recipe for {port_id}, keeping the first");
                        continue;
                    }

                    versions
                        .entry((*name).to_string())
                        .or_default()
                        .push((*version).to_string());
                    ports.insert(
                        port_id,
                        PortDescriptor::new(*name, *version, category.as_str(), recipe_path),
                    );
                }
            }
        }

        for list in versions.values_mut() {
            list.sort_by(|a, b| order.compare(a, b));
        }

        Ok(Self { ports, versions })
    }

    /// Look up a port descriptor by port-ID.
    pub fn port(&self, port_id: &str) -> Option<&PortDescriptor> {
        self.ports.get(port_id)
    }

    /// Check whether a port-ID is known.
    pub fn contains(&self, port_id: &str) -> bool {
        self.ports.contains_key(port_id)
    }

    /// Versions of a port name, sorted ascending. Empty for unknown names.
    pub fn versions(&self, name: &str) -> &[String] {
        self.versions.get(name).map_or(&[], Vec::as_slice)
    }

    /// Port names in case-insensitive lexical order.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.versions.keys().map(String::as_str).collect();
        names.sort_by_key(|name| name.to_lowercase());

        names
    }

    /// Number of known ports across all names and versions.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Check whether the catalog holds no ports at all.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Resolve a package specification back to the port-ID it was
    /// generated from.
    ///
    /// Splits on the last '-' into name and version, then tests the name
    /// verbatim and after each strip of a trailing '_'-delimited segment,
    /// until a known port-ID matches or the name is exhausted. Package
    /// producers generate sub-package names as `<portname>_<suffix>`,
    /// possibly nested, so this search is deterministic rather than a
    /// guess.
    pub fn resolve_port_id(&self, package_id: &str) -> Option<String> {
        let (mut name, version) = package_id.rsplit_once('-')?;
        loop {
            let port_id = format!("{name}-{version}");
            if self.ports.contains_key(&port_id) {
                return Some(port_id);
            }

            match name.rsplit_once('_') {
                Some((shorter, _)) => name = shorter,
                None => return None,
            }
        }
    }

    /// Search port names, optionally filtered by a regular expression.
    ///
    /// Returns matches in lexical order.
    pub fn search(&self, pattern: Option<&Regex>) -> Vec<&str> {
        self.versions
            .keys()
            .map(String::as_str)
            .filter(|name| pattern.is_none_or(|regex| regex.is_match(name)))
            .collect()
    }
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut subdirs: Vec<(String, PathBuf)> = sorted_entries(dir)?
        .into_iter()
        .filter(|(_, path)| path.is_dir())
        .collect();
    subdirs.sort_by(|(a, _), (b, _)| a.cmp(b));

    Ok(subdirs)
}

fn sorted_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files: Vec<(String, PathBuf)> = sorted_entries(dir)?
        .into_iter()
        .filter(|(_, path)| path.is_file())
        .collect();
    files.sort_by(|(a, _), (b, _)| a.cmp(b));

    Ok(files)
}

fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|err| CatalogError::Scan {
        source: err,
        path: dir.to_path_buf(),
    })?;

    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| CatalogError::Scan {
            source: err,
            path: dir.to_path_buf(),
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        listing.push((name, entry.path()));
    }

    Ok(listing)
}

/// Catalog construction error types.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Recipe tree directory cannot be read.
    #[error("failed to scan recipe tree at {:?}", path.display())]
    Scan {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::NaturalOrder;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn stage_recipe(root: &Path, category: &str, group: &str, file_name: &str) {
        let dir = root.join(category).join(group);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file_name), "").unwrap();
    }

    #[test]
    fn build_indexes_valid_recipes_only() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let root = scratch.path();
        stage_recipe(root, "dev-tools", "foo", "foo-1.0.recipe");
        stage_recipe(root, "dev-tools", "foo", "foo-2.0.recipe");
        stage_recipe(root, "dev-tools", "foo", "foo.recipe");
        stage_recipe(root, "dev-tools", "foo", "foo-extra-1.0.recipe");
        stage_recipe(root, "dev-tools", "foo", "notes.txt");
        stage_recipe(root, "dev-tools", ".hidden", "bar-1.0.recipe");
        stage_recipe(root, ".hidden-cat", "bar", "bar-1.0.recipe");
        stage_recipe(root, "misc", "bar", "bar-1.0.recipe");

        let catalog = Catalog::build(root, &NaturalOrder)?;

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("foo-1.0"));
        assert!(catalog.contains("foo-2.0"));
        assert!(!catalog.contains("bar-1.0"));
        assert_eq!(catalog.versions("foo"), ["1.0", "2.0"]);

        let port = catalog.port("foo-1.0").unwrap();
        assert_eq!(port.category, "dev-tools");
        assert_eq!(
            port.recipe_path,
            root.join("dev-tools").join("foo").join("foo-1.0.recipe")
        );

        Ok(())
    }

    #[test]
    fn build_sorts_versions_with_comparator() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let root = scratch.path();
        stage_recipe(root, "dev-tools", "foo", "foo-1.10.recipe");
        stage_recipe(root, "dev-tools", "foo", "foo-1.2.recipe");
        stage_recipe(root, "dev-tools", "foo", "foo-1.0.recipe");

        let catalog = Catalog::build(root, &NaturalOrder)?;
        assert_eq!(catalog.versions("foo"), ["1.0", "1.2", "1.10"]);

        Ok(())
    }

    #[test]
    fn build_fails_without_tree_root() {
        let result = Catalog::build("/definitely/not/here", &NaturalOrder);
        assert!(matches!(result, Err(CatalogError::Scan { .. })));
    }

    #[test]
    fn sorted_names_ignore_case() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let root = scratch.path();
        stage_recipe(root, "dev-tools", "Zulu", "Zulu-1.0.recipe");
        stage_recipe(root, "dev-tools", "alpha", "alpha-1.0.recipe");
        stage_recipe(root, "dev-tools", "Mike", "Mike-1.0.recipe");

        let catalog = Catalog::build(root, &NaturalOrder)?;
        assert_eq!(catalog.sorted_names(), vec!["alpha", "Mike", "Zulu"]);

        Ok(())
    }

    #[test]
    fn resolve_port_id_strips_subpackage_suffixes() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let root = scratch.path();
        stage_recipe(root, "dev-tools", "foo", "foo-1.2.recipe");
        stage_recipe(root, "dev-tools", "foo_bar", "foo_bar-1.2.recipe");

        let catalog = Catalog::build(root, &NaturalOrder)?;

        // Verbatim match wins over suffix stripping.
        assert_eq!(catalog.resolve_port_id("foo-1.2"), Some("foo-1.2".into()));
        assert_eq!(
            catalog.resolve_port_id("foo_bar-1.2"),
            Some("foo_bar-1.2".into())
        );

        // One strip, then nested strips.
        assert_eq!(
            catalog.resolve_port_id("foo_docs-1.2"),
            Some("foo-1.2".into())
        );
        assert_eq!(
            catalog.resolve_port_id("foo_bar_devel-1.2"),
            Some("foo_bar-1.2".into())
        );

        assert_eq!(catalog.resolve_port_id("ghost-1.2"), None);
        assert_eq!(catalog.resolve_port_id("foo-9.9"), None);
        assert_eq!(catalog.resolve_port_id("no dash here"), None);

        Ok(())
    }

    #[test]
    fn search_filters_by_pattern() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let root = scratch.path();
        stage_recipe(root, "dev-tools", "foo", "foo-1.0.recipe");
        stage_recipe(root, "dev-tools", "foobar", "foobar-1.0.recipe");
        stage_recipe(root, "net-misc", "curl", "curl-8.0.recipe");

        let catalog = Catalog::build(root, &NaturalOrder)?;

        assert_eq!(catalog.search(None), vec!["curl", "foo", "foobar"]);

        let pattern = Regex::new("^foo")?;
        assert_eq!(catalog.search(Some(&pattern)), vec!["foo", "foobar"]);

        Ok(())
    }
}
