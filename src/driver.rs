//! # Driver
//!
//! Ties the pieces together for one invocation:
//!
//! 1. load the manifest and look up the super project
//! 2. index every other project by canonical identity
//! 3. read the super project's `.gitmodules`
//! 4. reconcile it, printing each submodule's report as soon as it is done
//! 5. optionally do the same for every sibling project that declares
//!    submodules
//!
//! The driver never decides what a failure means for the process: it returns
//! a [`RunSummary`] and leaves the exit status to the caller.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::gitmodules::{self, SubmoduleEntry, DECLARATION_FILE};
use crate::manifest::{Manifest, ProjectRecord};
use crate::output::{emoji, OutputConfig};
use crate::reconcile::{
    Decision, EntryReport, Outcome, ProjectIndex, ReconcileOptions, Reconciler,
};
use crate::repository::{GitOperations, Repository};

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Path of the JSON manifest.
    pub manifest: PathBuf,
    /// Canonical name of the super project, e.g. `git.example.org/top/app`.
    pub super_project: String,
    /// Print the plan before executing it.
    pub verbose: bool,
    /// Also reconcile the submodules of every other manifest project.
    pub siblings: bool,
    pub options: ReconcileOptions,
}

/// Outcome counts over every reconciled entry, nested ones included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub repointed: usize,
    pub cloned: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Count `report` and everything below it.
    pub fn record(&mut self, report: &EntryReport) {
        report.walk(&mut |_, _, entry| match entry.outcome {
            Outcome::Repointed { .. } => self.repointed += 1,
            Outcome::Cloned { .. } => self.cloned += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
        });
    }

    pub fn total(&self) -> usize {
        self.repointed + self.cloned + self.skipped + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} repointed, {} cloned, {} skipped, {} failed",
            self.repointed, self.cloned, self.skipped, self.failed
        )
    }
}

/// Run against stdout.
pub fn run(config: &DriverConfig, git: &dyn GitOperations, output: &OutputConfig) -> Result<RunSummary> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_output(config, git, output, &mut out)
}

/// Run, writing the report to `out`.
///
/// Errors are returned only for problems that prevent reconciliation from
/// starting: an unreadable manifest, an unknown super project or a broken
/// super project `.gitmodules`. Per-submodule failures end up in the summary.
pub fn run_with_output<W: Write>(
    config: &DriverConfig,
    git: &dyn GitOperations,
    output: &OutputConfig,
    out: &mut W,
) -> Result<RunSummary> {
    let manifest = Manifest::from_file(&config.manifest)?;
    let super_project = manifest
        .find(&config.super_project)
        .ok_or_else(|| Error::ManifestLoad {
            path: config.manifest.clone(),
            message: format!(
                "super project {} is not in the manifest",
                config.super_project
            ),
        })?
        .clone();

    info!(
        "Loaded {} projects from {}",
        manifest.projects().len(),
        config.manifest.display()
    );

    if config.options.dry_run {
        writeln!(
            out,
            "{} DRY RUN - no repository will be modified",
            emoji(output, "🔎", "[DRY RUN]")
        )?;
    }

    let mut summary = RunSummary::default();

    let entries = gitmodules::read_optional(&super_project.source_directory)?;
    let declaration = super_project.source_directory.join(DECLARATION_FILE);
    if entries.is_empty() && declaration.is_file() {
        writeln!(out, "No submodules declared in {}", declaration.display())?;
    } else if entries.is_empty() {
        writeln!(
            out,
            "No {} found in super project {}",
            DECLARATION_FILE,
            super_project.source_directory.display()
        )?;
    } else {
        let reports = reconcile_project(config, git, output, &manifest, &super_project, &entries, out)?;
        for report in &reports {
            summary.record(report);
        }
    }

    if config.siblings {
        for sibling in manifest.projects() {
            if sibling.canonical_name == super_project.canonical_name {
                continue;
            }
            reconcile_sibling(config, git, output, &manifest, sibling, &mut summary, out)?;
        }
    }

    writeln!(out, "{}", output.heading(&format!("Summary: {}", summary)))?;
    Ok(summary)
}

fn reconcile_sibling<W: Write>(
    config: &DriverConfig,
    git: &dyn GitOperations,
    output: &OutputConfig,
    manifest: &Manifest,
    sibling: &ProjectRecord,
    summary: &mut RunSummary,
    out: &mut W,
) -> Result<()> {
    let entries = match gitmodules::read_optional(&sibling.source_directory) {
        Ok(entries) => entries,
        Err(e) => {
            writeln!(out, "{}", output.heading(&format!("{}:", sibling.canonical_name)))?;
            let report = EntryReport::new(
                Path::new(DECLARATION_FILE),
                Outcome::Failed {
                    message: e.to_string(),
                },
            );
            print_report(output, &report, out)?;
            summary.record(&report);
            return Ok(());
        }
    };

    if entries.is_empty() {
        if config.verbose && sibling.source_directory.join(DECLARATION_FILE).is_file() {
            writeln!(out, "{}: no submodules declared", sibling.canonical_name)?;
        } else if config.verbose {
            writeln!(out, "{}: no {} found", sibling.canonical_name, DECLARATION_FILE)?;
        }
        return Ok(());
    }

    writeln!(out, "{}", output.heading(&format!("{}:", sibling.canonical_name)))?;
    let reports = reconcile_project(config, git, output, manifest, sibling, &entries, out)?;
    for report in &reports {
        summary.record(report);
    }
    Ok(())
}

/// Reconcile the submodules `project` declares against every other project
/// in the manifest, printing the reports as they come.
fn reconcile_project<W: Write>(
    config: &DriverConfig,
    git: &dyn GitOperations,
    output: &OutputConfig,
    manifest: &Manifest,
    project: &ProjectRecord,
    entries: &[SubmoduleEntry],
    out: &mut W,
) -> Result<Vec<EntryReport>> {
    let candidates = manifest.without(&project.canonical_name);
    let index = ProjectIndex::new(&candidates)?;
    let containing = Repository::new(project.source_directory.clone(), project.identity()?);
    let reconciler = Reconciler::new(&index, git, config.options.clone());

    info!(
        "Reconciling {} submodules of {} against {} projects",
        entries.len(),
        project.canonical_name,
        index.len()
    );

    if config.verbose {
        print_plan(&reconciler, entries, &containing, project, out)?;
    }

    let mut printed = Ok(());
    let reports = reconciler.reconcile_with(entries, &containing, |report| {
        if printed.is_ok() {
            printed = print_report(output, report, out)
                .and_then(|()| out.flush().map_err(Error::from));
        }
    });
    printed?;
    Ok(reports)
}

fn print_plan<W: Write>(
    reconciler: &Reconciler<'_>,
    entries: &[SubmoduleEntry],
    containing: &Repository,
    project: &ProjectRecord,
    out: &mut W,
) -> Result<()> {
    let plan = reconciler.plan(entries, containing);
    let branch_suffix = |entry: &SubmoduleEntry| match &entry.branch {
        Some(branch) => format!(" branch {}", branch),
        None => String::new(),
    };

    let to_repoint: Vec<_> = plan
        .iter()
        .filter(|p| matches!(p.decision, Decision::Repoint { .. }))
        .collect();
    if !to_repoint.is_empty() {
        writeln!(
            out,
            "Following submodules of {} will be repointed at build projects:",
            project.canonical_name
        )?;
        for planned in to_repoint {
            if let Decision::Repoint { record } = &planned.decision {
                writeln!(
                    out,
                    "* {} => {}{}",
                    containing.module_dir(&planned.entry.path).display(),
                    record.canonical_name,
                    branch_suffix(&planned.entry)
                )?;
            }
        }
    }

    let to_clone: Vec<_> = plan
        .iter()
        .filter(|p| matches!(p.decision, Decision::Clone { .. }))
        .collect();
    if !to_clone.is_empty() {
        writeln!(
            out,
            "Following submodules of {} will be cloned:",
            project.canonical_name
        )?;
        for planned in to_clone {
            let source = planned
                .identity
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| planned.entry.url.clone());
            writeln!(
                out,
                "* {} from {}{}",
                containing.module_dir(&planned.entry.path).display(),
                source,
                branch_suffix(&planned.entry)
            )?;
        }
    }

    Ok(())
}

fn print_report<W: Write>(output: &OutputConfig, report: &EntryReport, out: &mut W) -> Result<()> {
    for line in output.report_lines(report) {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
