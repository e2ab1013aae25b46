// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep a package-info repository in sync with a recipe tree.
//!
//! A __port__ is a named, versioned buildable unit described by a single
//! recipe file. Portkeep scans a tree of such recipes, decides per port
//! name which single version is __active__ on the target architecture,
//! and maintains a repository directory holding one generated
//! package-info artifact per active package. Recipes that fail to parse
//! or are ineligible leave timestamped skip markers behind so they are
//! not re-parsed until they actually change, and artifacts that lose
//! their owning recipe are swept out. Their built packages are moved
//! into an obsolete holding area, never deleted.
//!
//! The interesting pieces are [`catalog::Catalog`] (the frozen index of
//! the tree), [`repo::Repository`] (populate/update synchronization plus
//! stale collection), and the [`port::PortOps`] seam the synchronizer
//! drives per-port work through.

pub mod catalog;
pub mod config;
pub mod path;
pub mod port;
pub mod recipe;
pub mod repo;
pub mod version;

pub use catalog::Catalog;
pub use port::{PortDescriptor, PortOps, RecipeOps};
pub use recipe::{Recipe, RecipeStatus};
pub use repo::{Repository, SyncMode, SyncReport};
pub use version::{NaturalOrder, VersionOrder};
