//! The reconciliation engine.
//!
//! Work happens in two steps per submodule:
//!
//! 1. [`Reconciler::decide`] is pure: it resolves the submodule URL, guards
//!    against cycles and consults the [`ProjectIndex`].
//! 2. The decision is executed through [`GitOperations`] unless the run is a
//!    dry run, and the result is recorded as an [`Outcome`].
//!
//! A failure while executing one submodule is recorded and the next sibling
//! is processed; nothing here aborts a run.

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::{
    EntryReport, MissingSourcePolicy, Outcome, ProjectIndex, ReconcileOptions, MISSING_SOURCE,
    REQUIRED_UNRESOLVED,
};
use crate::error::{Error, Result};
use crate::gitmodules::{self, SubmoduleEntry, DECLARATION_FILE};
use crate::identity::{self, CanonicalIdentity};
use crate::manifest::ProjectRecord;
use crate::repository::{GitOperations, Repository};

/// What should happen to one submodule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Bind to the orchestrator's checkout of `record`.
    Repoint { record: ProjectRecord },
    /// Initialize from the declared remote.
    Clone { url: String },
    Skip { reason: String },
    Fail { message: String },
}

/// A submodule together with the decision taken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub entry: SubmoduleEntry,
    pub identity: Option<CanonicalIdentity>,
    pub decision: Decision,
    pub warnings: Vec<String>,
}

/// Reconciles submodule declarations against the build's project records.
pub struct Reconciler<'a> {
    index: &'a ProjectIndex,
    git: &'a dyn GitOperations,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(index: &'a ProjectIndex, git: &'a dyn GitOperations, options: ReconcileOptions) -> Self {
        Self {
            index,
            git,
            options,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Decide for every entry of `containing` without executing anything.
    pub fn plan(&self, entries: &[SubmoduleEntry], containing: &Repository) -> Vec<PlannedEntry> {
        let ancestors = [containing.identity.clone()];
        entries
            .iter()
            .map(|entry| self.decide(entry, containing, &ancestors))
            .collect()
    }

    /// Reconcile `entries`, declared by `containing`, in declaration order.
    ///
    /// Returns exactly one report per entry; nested reports hang off their
    /// parent's `children`.
    pub fn reconcile(&self, entries: &[SubmoduleEntry], containing: &Repository) -> Vec<EntryReport> {
        self.reconcile_with(entries, containing, |_| {})
    }

    /// Like [`Reconciler::reconcile`], handing each top-level report to
    /// `on_report` as soon as the entry and everything below it is done.
    pub fn reconcile_with<F>(
        &self,
        entries: &[SubmoduleEntry],
        containing: &Repository,
        mut on_report: F,
    ) -> Vec<EntryReport>
    where
        F: FnMut(&EntryReport),
    {
        let mut ancestors = vec![containing.identity.clone()];
        entries
            .iter()
            .map(|entry| {
                let report = self.reconcile_entry(entry, containing, &mut ancestors);
                on_report(&report);
                report
            })
            .collect()
    }

    /// Decide what to do with one entry. `ancestors` holds the identities of
    /// every repository on the path from the top-level superproject down to
    /// `containing`, inclusive.
    pub fn decide(
        &self,
        entry: &SubmoduleEntry,
        containing: &Repository,
        ancestors: &[CanonicalIdentity],
    ) -> PlannedEntry {
        let mut planned = PlannedEntry {
            entry: entry.clone(),
            identity: None,
            decision: Decision::Clone {
                url: entry.url.clone(),
            },
            warnings: Vec::new(),
        };

        let identity = match identity::resolve(&entry.url, Some(&containing.identity)) {
            Ok(identity) => identity,
            Err(e) => {
                planned.decision = Decision::Fail {
                    message: e.to_string(),
                };
                return planned;
            }
        };
        planned.identity = Some(identity.clone());

        if ancestors.contains(&identity) {
            let cycle = ancestors
                .iter()
                .map(ToString::to_string)
                .chain(std::iter::once(identity.to_string()))
                .collect::<Vec<_>>()
                .join(" -> ");
            planned.decision = Decision::Skip {
                reason: format!("submodule refers back to an ancestor: {}", cycle),
            };
            return planned;
        }

        planned.decision = match self.index.lookup(&identity) {
            Some(found) => {
                if found.shadowed > 0 {
                    planned.warnings.push(format!(
                        "{} projects share canonical identity {}; using {}",
                        found.shadowed + 1,
                        found.identity,
                        found.record.canonical_name
                    ));
                }

                if self.git.is_work_tree(&found.record.source_directory) {
                    Decision::Repoint {
                        record: found.record.clone(),
                    }
                } else if found.record.required {
                    Decision::Fail {
                        message: MISSING_SOURCE.to_string(),
                    }
                } else {
                    match self.options.missing_source {
                        MissingSourcePolicy::Fail => Decision::Fail {
                            message: MISSING_SOURCE.to_string(),
                        },
                        MissingSourcePolicy::Skip => Decision::Skip {
                            reason: format!(
                                "{} has no checkout in the build context and is not required",
                                found.record.canonical_name
                            ),
                        },
                        MissingSourcePolicy::Clone => Decision::Clone {
                            url: entry.url.clone(),
                        },
                    }
                }
            }
            None => match self.index.required_elsewhere(&identity) {
                Some(required) => {
                    planned.warnings.push(format!(
                        "submodule URL resolves to {} but the build requires {}",
                        identity, required.canonical_name
                    ));
                    Decision::Fail {
                        message: REQUIRED_UNRESOLVED.to_string(),
                    }
                }
                None => Decision::Clone {
                    url: entry.url.clone(),
                },
            },
        };

        planned
    }

    fn reconcile_level(
        &self,
        entries: &[SubmoduleEntry],
        containing: &Repository,
        ancestors: &mut Vec<CanonicalIdentity>,
    ) -> Vec<EntryReport> {
        entries
            .iter()
            .map(|entry| self.reconcile_entry(entry, containing, ancestors))
            .collect()
    }

    fn reconcile_entry(
        &self,
        entry: &SubmoduleEntry,
        containing: &Repository,
        ancestors: &mut Vec<CanonicalIdentity>,
    ) -> EntryReport {
        let planned = self.decide(entry, containing, ancestors);
        let outcome = self.execute(&planned, containing);

        match &outcome {
            Outcome::Failed { message } => {
                warn!("{}: {}", containing.module_dir(&entry.path).display(), message)
            }
            other => info!(
                "{}: {}",
                containing.module_dir(&entry.path).display(),
                other
            ),
        }

        let children = if self.options.recursive && outcome.is_materialized() {
            self.descend(&planned, containing, ancestors)
        } else {
            Vec::new()
        };

        EntryReport {
            path: entry.path.clone(),
            identity: planned.identity,
            outcome,
            warnings: planned.warnings,
            children,
        }
    }

    fn execute(&self, planned: &PlannedEntry, containing: &Repository) -> Outcome {
        let entry = &planned.entry;
        let module_dir = containing.module_dir(&entry.path);

        let (result, outcome) = match &planned.decision {
            Decision::Fail { message } => {
                return Outcome::Failed {
                    message: message.clone(),
                }
            }
            Decision::Skip { reason } => {
                return Outcome::Skipped {
                    reason: reason.clone(),
                }
            }
            Decision::Repoint { record } => {
                let outcome = Outcome::Repointed {
                    source_dir: record.source_directory.clone(),
                };
                if self.options.dry_run {
                    return outcome;
                }
                // Only reachable with an identity: decide() resolved it first.
                let ssh_url = planned
                    .identity
                    .as_ref()
                    .map(CanonicalIdentity::ssh_url)
                    .unwrap_or_else(|| entry.url.clone());
                (self.repoint(entry, containing, record, &ssh_url), outcome)
            }
            Decision::Clone { url } => {
                let outcome = Outcome::Cloned { url: url.clone() };
                if self.options.dry_run {
                    return outcome;
                }
                (
                    self.git.submodule_update(&containing.root, &entry.path),
                    outcome,
                )
            }
        };

        match result {
            Ok(()) => outcome,
            Err(e @ Error::Reconciliation { .. }) => Outcome::Failed {
                message: e.to_string(),
            },
            Err(e) => Outcome::Failed {
                message: Error::Reconciliation {
                    path: module_dir,
                    message: e.to_string(),
                }
                .to_string(),
            },
        }
    }

    /// Bind the submodule at `entry.path` to the checkout in
    /// `record.source_directory`.
    fn repoint(
        &self,
        entry: &SubmoduleEntry,
        containing: &Repository,
        record: &ProjectRecord,
        ssh_url: &str,
    ) -> Result<()> {
        let git = self.git;
        let source = &record.source_directory;
        let module_dir = containing.module_dir(&entry.path);
        let refname = entry.branch.as_deref().unwrap_or("HEAD");

        git.submodule_init(&containing.root, &entry.path)?;
        git.set_submodule_url(&containing.root, &entry.name, ssh_url)?;

        if git.is_work_tree(&module_dir) {
            git.fetch(&module_dir, source, refname)?;
        } else {
            git.clone_shared(source, &module_dir)?;
        }
        // Everything below runs inside module_dir; without a work tree there
        // git would act on the containing repository instead.
        if !git.is_work_tree(&module_dir) {
            return Err(Error::Reconciliation {
                path: module_dir,
                message: format!("no work tree after cloning {}", source.display()),
            });
        }
        git.set_remote_url(&module_dir, "origin", ssh_url)?;

        let revision = git.resolve_revision(source, refname)?;
        git.checkout(&module_dir, &revision, entry.branch.as_deref())?;
        git.absorb_git_dirs(&containing.root, &entry.path)
    }

    /// Reconcile the submodules of a materialized submodule.
    fn descend(
        &self,
        planned: &PlannedEntry,
        containing: &Repository,
        ancestors: &mut Vec<CanonicalIdentity>,
    ) -> Vec<EntryReport> {
        let Some(identity) = planned.identity.clone() else {
            return Vec::new();
        };
        let module_dir = containing.module_dir(&planned.entry.path);

        // A repointed module has the same content as its source checkout,
        // which is also the only place to look during a dry run.
        let declaring_dir: PathBuf = match &planned.decision {
            Decision::Repoint { record } => record.source_directory.clone(),
            Decision::Clone { .. } if !self.options.dry_run => module_dir.clone(),
            _ => return Vec::new(),
        };

        let entries = match gitmodules::read_optional(&declaring_dir) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![EntryReport::new(
                    Path::new(DECLARATION_FILE),
                    Outcome::Failed {
                        message: e.to_string(),
                    },
                )]
            }
        };
        if entries.is_empty() {
            return Vec::new();
        }

        let nested = Repository::new(module_dir, identity.clone());
        ancestors.push(identity);
        let reports = self.reconcile_level(&entries, &nested, ancestors);
        ancestors.pop();
        reports
    }
}
