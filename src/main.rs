// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use portkeep::{
    catalog::Catalog,
    config::{TreeConfig, TreeSettings},
    path::default_config_file,
    port::RecipeOps,
    repo::Repository,
    version::NaturalOrder,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regex::Regex;
use std::{fs, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  portkeep [options] <portkeep-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Only report warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    fn run(self) -> Result<()> {
        let quiet = self.quiet;
        match self.command {
            Command::Sync(opts) => run_sync(opts, quiet),
            Command::Search(opts) => run_search(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Synchronize the package-info repository with the recipe tree.
    #[command(override_usage = "portkeep sync [options]")]
    Sync(SyncOptions),

    /// Search ports in the recipe tree by name.
    #[command(override_usage = "portkeep search [options] [<pattern>]")]
    Search(SearchOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncOptions {
    /// Path to tree configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Recipe tree root.
    #[arg(short, long, value_name = "path")]
    pub tree: Option<PathBuf>,

    /// Built packages directory.
    #[arg(short, long, value_name = "path")]
    pub packages: Option<PathBuf>,

    /// Target architecture to evaluate recipes against.
    #[arg(short, long, value_name = "arch")]
    pub arch: Option<String>,

    /// Accept recipes that are untested on the target architecture.
    #[arg(long)]
    pub allow_untested: bool,

    /// Keep build flags as they are instead of clearing them.
    #[arg(long)]
    pub preserve_flags: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SearchOptions {
    /// Regular expression to match port names against.
    #[arg(value_name = "pattern")]
    pub pattern: Option<String>,

    /// Path to tree configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Recipe tree root.
    #[arg(short, long, value_name = "path")]
    pub tree: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer().compact().with_target(false).without_time();
    let default_filter = if cli.quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap();
    tracing_subscriber::registry().with(layer).with(filter).init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run_sync(opts: SyncOptions, quiet: bool) -> Result<()> {
    let settings = resolve_config(opts.config)?.map(|config| config.settings);

    let tree = opts
        .tree
        .or_else(|| settings.as_ref().map(|settings| settings.tree.clone()))
        .context("no recipe tree given, pass --tree or a configuration file")?;
    let packages = opts
        .packages
        .or_else(|| settings.as_ref().and_then(|settings| settings.packages.clone()))
        .unwrap_or_else(|| tree.join("packages"));
    let arch = opts
        .arch
        .or_else(|| settings.as_ref().map(|settings| settings.target_arch.clone()))
        .context("no target architecture given, pass --arch or a configuration file")?;
    let allow_untested = opts.allow_untested
        || settings
            .as_ref()
            .is_some_and(|settings: &TreeSettings| settings.allow_untested);

    let catalog = Catalog::build(&tree, &NaturalOrder)?;
    info!("found {} ports under {:?}", catalog.len(), tree.display());

    let repository = Repository::new(
        tree.join("repository"),
        packages,
        allow_untested,
        quiet,
        RecipeOps::new(arch),
    );
    let report = repository.synchronize(&catalog, opts.preserve_flags)?;
    info!(
        "{} package infos written, {} recipes skipped, {} broken, {} stale artifacts removed",
        report.written.len(),
        report.skipped.len(),
        report.broken.len(),
        report.stale_removed.len()
    );

    Ok(())
}

fn run_search(opts: SearchOptions) -> Result<()> {
    let settings = resolve_config(opts.config)?.map(|config| config.settings);
    let tree = opts
        .tree
        .or_else(|| settings.map(|settings| settings.tree))
        .context("no recipe tree given, pass --tree or a configuration file")?;
    let pattern = opts.pattern.as_deref().map(Regex::new).transpose()?;

    let catalog = Catalog::build(&tree, &NaturalOrder)?;
    for name in catalog.search(pattern.as_ref()) {
        println!("{name}");
    }

    Ok(())
}

fn resolve_config(path: Option<PathBuf>) -> Result<Option<TreeConfig>> {
    let path = match path {
        Some(path) => path,
        None => match default_config_file() {
            Ok(path) if path.is_file() => path,
            _ => return Ok(None),
        },
    };

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration at {:?}", path.display()))?;
    let config = contents
        .parse::<TreeConfig>()
        .with_context(|| format!("failed to parse configuration at {:?}", path.display()))?;

    Ok(Some(config))
}
