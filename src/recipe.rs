// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Recipe layout.
//!
//! Specify the layout of recipe files, and of the package-info documents
//! generated from them. A recipe describes exactly one port at exactly one
//! version; the name and version live in the recipe's file name, so the
//! recipe body only carries descriptive fields and per-architecture build
//! status. File I/O is left to the caller to figure out.
//!
//! # General Layout
//!
//! A recipe is a TOML document with a summary, an optional longer
//! description, an optional listing of sub-packages, and a table mapping
//! architecture names to a build status. The special architecture key "any"
//! acts as a wildcard fallback for architectures not listed explicitly:
//!
//! ```toml
//! summary = "A tiny example"
//! subpackages = ["devel", "docs"]
//!
//! [architectures]
//! x86_64 = "stable"
//! arm64 = "untested"
//! ```
//!
//! A port with sub-packages emits one package-info per sub-package next to
//! its primary one, named `<name>_<sub>-<version>`.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, path::PathBuf, str::FromStr};

/// Recipe file layout.
#[derive(Debug, Default, PartialEq, Eq, Clone, Deserialize)]
pub struct Recipe {
    /// Brief description of what the port provides.
    #[serde(default)]
    pub summary: String,

    /// Longer prose description.
    pub description: Option<String>,

    /// Sub-packages split out of the port, e.g. "devel" or "docs".
    #[serde(default)]
    pub subpackages: Vec<String>,

    /// Build status per target architecture.
    #[serde(default)]
    pub architectures: BTreeMap<String, RecipeStatus>,
}

impl Recipe {
    /// Build status of this recipe on the given architecture.
    ///
    /// Falls back to the wildcard "any" entry when the architecture is not
    /// listed explicitly, and to [`RecipeStatus::Unsupported`] when neither
    /// is present.
    pub fn status_on(&self, arch: &str) -> RecipeStatus {
        self.architectures
            .get(arch)
            .or_else(|| self.architectures.get("any"))
            .copied()
            .unwrap_or(RecipeStatus::Unsupported)
    }

    /// Validate fields that strict parsing demands.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::MissingSummary`] if the summary is empty.
    pub fn validate_strict(&self) -> Result<()> {
        if self.summary.trim().is_empty() {
            return Err(RecipeError::MissingSummary);
        }

        Ok(())
    }
}

impl FromStr for Recipe {
    type Err = RecipeError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let recipe: Recipe = toml::de::from_str(data).map_err(RecipeError::Syntax)?;

        // INVARIANT: A recipe must declare at least one architecture.
        if recipe.architectures.is_empty() {
            return Err(RecipeError::NoArchitectures);
        }

        Ok(recipe)
    }
}

/// Build status of a recipe on one target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    /// Builds and is known to work.
    Stable,

    /// Builds, but nobody has vouched for the result yet.
    Untested,

    /// Does not apply to the target architecture.
    Unsupported,
}

impl fmt::Display for RecipeStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stable => "stable",
            Self::Untested => "untested",
            Self::Unsupported => "unsupported",
        };

        fmt.write_str(name)
    }
}

/// Generated package-info document.
///
/// The repository only ever inspects a package-info's file name and
/// modification time; the rendered content exists for downstream consumers.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct PackageInfo {
    /// Package name, including any sub-package suffix.
    pub name: String,

    /// Version shared with the originating port.
    pub version: String,

    /// Summary carried over from the recipe.
    pub summary: String,

    /// Port identifier the package-info was generated from.
    pub source: String,
}

impl PackageInfo {
    /// Render the package-info as a TOML document.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Render`] if serialization fails.
    pub fn render(&self) -> Result<String> {
        toml::ser::to_string_pretty(self).map_err(RecipeError::Render)
    }
}

/// Recipe handling error types.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// Recipe is not well-formed TOML.
    #[error(transparent)]
    Syntax(#[from] toml::de::Error),

    /// Recipe declares no target architectures at all.
    #[error("recipe declares no architectures")]
    NoArchitectures,

    /// Strict parsing demands a summary.
    #[error("recipe has no summary")]
    MissingSummary,

    /// Package-info cannot be rendered.
    #[error(transparent)]
    Render(#[from] toml::ser::Error),

    /// Recipe file cannot be read.
    #[error("failed to read recipe at {:?}", recipe_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        recipe_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = RecipeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserialize_recipe() -> anyhow::Result<()> {
        let result: Recipe = indoc! {r#"
            summary = "blah blah blah"
            description = "much longer blah"
            subpackages = ["devel", "docs"]

            [architectures]
            x86_64 = "stable"
            arm64 = "untested"
            sparc = "unsupported"
        "#}
        .parse()?;

        let expect = Recipe {
            summary: "blah blah blah".into(),
            description: Some("much longer blah".into()),
            subpackages: vec!["devel".into(), "docs".into()],
            architectures: [
                ("x86_64".into(), RecipeStatus::Stable),
                ("arm64".into(), RecipeStatus::Untested),
                ("sparc".into(), RecipeStatus::Unsupported),
            ]
            .into_iter()
            .collect(),
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn reject_recipe_without_architectures() {
        let result = r#"summary = "no targets""#.parse::<Recipe>();
        assert!(matches!(result, Err(RecipeError::NoArchitectures)));
    }

    #[test]
    fn reject_malformed_recipe() {
        let result = "definitely not toml [".parse::<Recipe>();
        assert!(matches!(result, Err(RecipeError::Syntax(_))));
    }

    #[test]
    fn status_falls_back_to_wildcard() -> anyhow::Result<()> {
        let recipe: Recipe = indoc! {r#"
            summary = "blah"

            [architectures]
            any = "untested"
            x86_64 = "stable"
        "#}
        .parse()?;

        assert_eq!(recipe.status_on("x86_64"), RecipeStatus::Stable);
        assert_eq!(recipe.status_on("arm64"), RecipeStatus::Untested);

        Ok(())
    }

    #[test]
    fn status_defaults_to_unsupported() -> anyhow::Result<()> {
        let recipe: Recipe = indoc! {r#"
            summary = "blah"

            [architectures]
            x86_64 = "stable"
        "#}
        .parse()?;

        assert_eq!(recipe.status_on("riscv64"), RecipeStatus::Unsupported);

        Ok(())
    }

    #[test]
    fn strict_validation_requires_summary() -> anyhow::Result<()> {
        let recipe: Recipe = indoc! {r#"
            [architectures]
            x86_64 = "stable"
        "#}
        .parse()?;

        assert!(matches!(
            recipe.validate_strict(),
            Err(RecipeError::MissingSummary)
        ));

        Ok(())
    }

    #[test]
    fn render_package_info() -> anyhow::Result<()> {
        let result = PackageInfo {
            name: "foo_docs".into(),
            version: "1.2".into(),
            summary: "blah blah blah".into(),
            source: "foo-1.2".into(),
        }
        .render()?;

        let expect = indoc! {r#"
            name = "foo_docs"
            version = "1.2"
            summary = "blah blah blah"
            source = "foo-1.2"
        "#};

        assert_eq!(result, expect);

        Ok(())
    }
}
