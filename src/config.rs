// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for configuration files that Portkeep uses to
//! simplify the process of serialization and deserialization. File I/O is
//! left to the caller to figure out.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Tree configuration layout.
///
/// A tree configuration names the recipe tree to synchronize from, where
/// built packages live, and the policy knobs the synchronizer consults:
/// the target architecture to evaluate recipes against, and whether
/// untested recipes may contribute package-infos.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct TreeConfig {
    /// Settings for the recipe tree.
    pub settings: TreeSettings,
}

impl FromStr for TreeConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: TreeConfig = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on path fields.
        config.settings.tree = expand_path(&config.settings.tree)?;
        if let Some(packages) = &config.settings.packages {
            config.settings.packages = Some(expand_path(packages)?);
        }

        Ok(config)
    }
}

impl Display for TreeConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Tree configuration settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct TreeSettings {
    /// Recipe tree root.
    pub tree: PathBuf,

    /// Built packages directory. Defaults to "packages" under the tree.
    pub packages: Option<PathBuf>,

    /// Architecture recipes are evaluated against.
    pub target_arch: String,

    /// Accept recipes whose status is untested on the target architecture.
    #[serde(default)]
    pub allow_untested: bool,
}

impl TreeSettings {
    /// Resolved built packages directory.
    pub fn packages_dir(&self) -> PathBuf {
        self.packages
            .clone()
            .unwrap_or_else(|| self.tree.join("packages"))
    }

    /// Resolved package-info repository directory.
    pub fn repository_dir(&self) -> PathBuf {
        self.tree.join("repository")
    }
}

fn expand_path(path: &PathBuf) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("BLAH", "/home/blah/ports")])]
    fn deserialize_tree_config() -> anyhow::Result<()> {
        let result: TreeConfig = r#"
            [settings]
            tree = "$BLAH"
            packages = "$BLAH/packages"
            target_arch = "x86_64"
            allow_untested = true
        "#
        .parse()?;

        let expect = TreeConfig {
            settings: TreeSettings {
                tree: "/home/blah/ports".into(),
                packages: Some("/home/blah/ports/packages".into()),
                target_arch: "x86_64".into(),
                allow_untested: true,
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_minimal_tree_config() -> anyhow::Result<()> {
        let result: TreeConfig = r#"
            [settings]
            tree = "/srv/ports"
            target_arch = "arm64"
        "#
        .parse()?;

        assert_eq!(result.settings.packages, None);
        assert!(!result.settings.allow_untested);
        assert_eq!(
            result.settings.packages_dir(),
            PathBuf::from("/srv/ports/packages")
        );
        assert_eq!(
            result.settings.repository_dir(),
            PathBuf::from("/srv/ports/repository")
        );

        Ok(())
    }

    #[test]
    fn serialize_tree_config() {
        let result = TreeConfig {
            settings: TreeSettings {
                tree: "/srv/ports".into(),
                packages: Some("/srv/ports/packages".into()),
                target_arch: "x86_64".into(),
                allow_untested: false,
            },
        }
        .to_string();

        let expect = indoc! {r#"
            [settings]
            tree = "/srv/ports"
            packages = "/srv/ports/packages"
            target_arch = "x86_64"
            allow_untested = false
        "#};

        assert_eq!(result, expect);
    }
}
