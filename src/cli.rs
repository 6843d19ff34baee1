//! CLI argument parsing and dispatch to the driver

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};

use submodule_reconcile::driver::{self, DriverConfig};
use submodule_reconcile::output::OutputConfig;
use submodule_reconcile::reconcile::{MissingSourcePolicy, ReconcileOptions};
use submodule_reconcile::repository::DefaultGitOperations;

/// Submodule Reconcile - Point git submodules at the projects a CI build
/// already checked out
#[derive(Parser, Debug)]
#[command(name = "submodule-reconcile")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON manifest with the build's `projects` mapping
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Canonical name of the super project (e.g. example.com/foo/bar)
    #[arg(value_name = "SUPER_PROJECT")]
    super_project: String,

    /// Print the plan before reconciling
    #[arg(short, long)]
    verbose: bool,

    /// Reconcile the submodules of repointed and cloned submodules too
    #[arg(short, long)]
    recursive: bool,

    /// Show what would be done without touching any repository
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Also reconcile the submodules of every other project in the manifest
    #[arg(long)]
    siblings: bool,

    /// What to do when an optional project has no usable checkout
    #[arg(long, value_name = "POLICY", value_enum, default_value_t = OnMissingSource::Fail)]
    on_missing_source: OnMissingSource,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", env = "SUBMODULE_RECONCILE_LOG")]
    log_level: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OnMissingSource {
    /// Report the submodule as failed
    Fail,
    /// Leave the submodule alone
    Skip,
    /// Clone the submodule from its declared remote
    Clone,
}

impl From<OnMissingSource> for MissingSourcePolicy {
    fn from(value: OnMissingSource) -> Self {
        match value {
            OnMissingSource::Fail => MissingSourcePolicy::Fail,
            OnMissingSource::Skip => MissingSourcePolicy::Skip,
            OnMissingSource::Clone => MissingSourcePolicy::Clone,
        }
    }
}

impl Cli {
    /// Execute the reconciliation described by the arguments
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        let output = OutputConfig::from_env_and_flag(&self.color);
        let config = DriverConfig {
            manifest: self.manifest,
            super_project: self.super_project,
            verbose: self.verbose,
            siblings: self.siblings,
            options: ReconcileOptions {
                recursive: self.recursive,
                dry_run: self.dry_run,
                missing_source: self.on_missing_source.into(),
            },
        };

        let summary = driver::run(&config, &DefaultGitOperations, &output)?;
        if !summary.is_success() {
            bail!("{} of {} submodules failed to reconcile", summary.failed, summary.total());
        }
        Ok(())
    }

    fn log_filter(&self) -> &str {
        match (&self.log_level, self.verbose) {
            (Some(level), _) => level.as_str(),
            (None, true) => "info",
            (None, false) => "warn",
        }
    }

    fn init_logging(&self) {
        let _ = env_logger::Builder::new()
            .parse_filters(self.log_filter())
            .format_timestamp(None)
            .try_init();
    }
}
