//! # Submodule Reconciliation
//!
//! This is the core of `submodule-reconcile`: for every submodule a
//! repository declares, decide whether the orchestrator already checked the
//! project out for this build, and act on that decision.
//!
//! ## Decisions
//!
//! | Project record            | Source directory       | Result                      |
//! |---------------------------|------------------------|-----------------------------|
//! | matches by identity       | is a work tree         | **repoint** at the checkout |
//! | matches, `required`       | missing / not a repo   | **failed**                  |
//! | matches, not required     | missing / not a repo   | per [`MissingSourcePolicy`] |
//! | none, but a required project has the same path on another host | - | **failed** |
//! | none                      | -                      | **clone** from declared URL |
//!
//! Repointing binds the submodule to the orchestrator's checkout (sharing its
//! object store), which is what makes speculative, unmerged revisions
//! visible to the build. Cloning falls back to a regular
//! `git submodule update --init`.
//!
//! ## Recursion
//!
//! With [`ReconcileOptions::recursive`], every repointed or cloned submodule
//! has its own `.gitmodules` reconciled against the same project records,
//! depth first. The identities on the current path are tracked so that a
//! submodule pointing back at an ancestor is skipped instead of looping.
//!
//! ## Modules
//!
//! - [`index`]: lookup of project records by canonical identity
//! - [`engine`]: the [`Reconciler`] that decides and executes

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::identity::CanonicalIdentity;

pub mod engine;
pub mod index;

pub use engine::{Decision, PlannedEntry, Reconciler};
pub use index::{ProjectIndex, ProjectMatch};

/// Diagnostic for a matched project whose checkout is unusable.
pub const MISSING_SOURCE: &str = "declared project missing from build context";

/// Diagnostic for a submodule whose project the build requires but which
/// could not be matched.
pub const REQUIRED_UNRESOLVED: &str = "required project not resolved";

/// What to do when a project that is *not* marked required has a record but
/// no usable source directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingSourcePolicy {
    /// Record a failure.
    #[default]
    Fail,
    /// Leave the submodule alone.
    Skip,
    /// Clone the submodule from its declared remote.
    Clone,
}

impl fmt::Display for MissingSourcePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingSourcePolicy::Fail => "fail",
            MissingSourcePolicy::Skip => "skip",
            MissingSourcePolicy::Clone => "clone",
        };
        f.write_str(name)
    }
}

impl FromStr for MissingSourcePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(MissingSourcePolicy::Fail),
            "skip" => Ok(MissingSourcePolicy::Skip),
            "clone" => Ok(MissingSourcePolicy::Clone),
            other => Err(format!(
                "unknown missing-source policy '{}' (expected fail, skip or clone)",
                other
            )),
        }
    }
}

/// Knobs for a reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Descend into the `.gitmodules` of repointed and cloned submodules.
    pub recursive: bool,
    /// Decide and report, but do not touch any repository.
    pub dry_run: bool,
    pub missing_source: MissingSourcePolicy,
}

/// The result of reconciling one submodule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Bound to the orchestrator's checkout.
    Repointed { source_dir: PathBuf },
    /// Initialized from the declared remote.
    Cloned { url: String },
    /// Deliberately left alone.
    Skipped { reason: String },
    Failed { message: String },
}

impl Outcome {
    /// Short lower-case name of the outcome kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Repointed { .. } => "repointed",
            Outcome::Cloned { .. } => "cloned",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Failed { .. } => "failed",
        }
    }

    /// Human-readable payload of the outcome.
    pub fn detail(&self) -> String {
        match self {
            Outcome::Repointed { source_dir } => source_dir.display().to_string(),
            Outcome::Cloned { url } => url.clone(),
            Outcome::Skipped { reason } => reason.clone(),
            Outcome::Failed { message } => message.clone(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    /// Whether the submodule's content is (or would be) in place, which is
    /// the precondition for recursion.
    pub fn is_materialized(&self) -> bool {
        matches!(self, Outcome::Repointed { .. } | Outcome::Cloned { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind(), self.detail())
    }
}

/// Report for one submodule, including the reports of its own submodules
/// when reconciliation was recursive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    /// Path of the submodule relative to the repository that declares it.
    pub path: PathBuf,
    /// Resolved identity, absent when the URL could not be resolved.
    pub identity: Option<CanonicalIdentity>,
    pub outcome: Outcome,
    /// Warning-level diagnostics attached to the outcome.
    pub warnings: Vec<String>,
    /// Nested submodule reports, one level down.
    pub children: Vec<EntryReport>,
}

impl EntryReport {
    pub fn new(path: impl Into<PathBuf>, outcome: Outcome) -> Self {
        Self {
            path: path.into(),
            identity: None,
            outcome,
            warnings: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Whether this report or any nested report failed.
    pub fn has_failures(&self) -> bool {
        self.outcome.is_failed() || self.children.iter().any(EntryReport::has_failures)
    }

    /// Visit this report and all nested reports depth first. The callback
    /// receives the nesting depth and the path joined onto its ancestors'.
    pub fn walk<F>(&self, f: &mut F)
    where
        F: FnMut(usize, &Path, &EntryReport),
    {
        self.walk_from(0, Path::new(""), f);
    }

    fn walk_from<F>(&self, depth: usize, prefix: &Path, f: &mut F)
    where
        F: FnMut(usize, &Path, &EntryReport),
    {
        let full_path = prefix.join(&self.path);
        f(depth, &full_path, self);
        for child in &self.children {
            child.walk_from(depth + 1, &full_path, f);
        }
    }
}
