//! # Repositories and the Git Seam
//!
//! The reconciliation engine never runs `git` itself. Every version-control
//! action it needs goes through the [`GitOperations`] trait, which keeps the
//! decision logic testable without real repositories:
//!
//! - In the application, [`DefaultGitOperations`] forwards to the wrappers
//!   in [`crate::git`], which shell out to the system `git` binary.
//! - In tests, a recording implementation captures the calls instead.
//!
//! [`Repository`] names a repository whose `.gitmodules` is being
//! reconciled: where its work tree is and which canonical identity it has
//! (the base for relative submodule URLs).

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::identity::CanonicalIdentity;

/// A repository that declares submodules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Root of the work tree.
    pub root: PathBuf,
    /// Canonical identity of the repository's own remote.
    pub identity: CanonicalIdentity,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>, identity: CanonicalIdentity) -> Self {
        Self {
            root: root.into(),
            identity,
        }
    }

    /// Absolute location of a submodule declared at `path`.
    pub fn module_dir(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

/// Version-control operations the reconciliation engine depends on.
///
/// All operations are synchronous and expected to be idempotent.
pub trait GitOperations: Send + Sync {
    /// Whether `dir` is the top of a git work tree.
    fn is_work_tree(&self, dir: &Path) -> bool {
        crate::git::is_work_tree(dir)
    }

    /// Register the submodule at `path` in the repository's local config.
    fn submodule_init(&self, repo: &Path, path: &Path) -> Result<()>;

    /// Set `submodule.<name>.url` in the repository's local config.
    fn set_submodule_url(&self, repo: &Path, name: &str, url: &str) -> Result<()>;

    /// Create `target` as a clone of the local `source`, sharing its object
    /// store.
    fn clone_shared(&self, source: &Path, target: &Path) -> Result<()>;

    /// Fetch `refname` from the local `source` into `repo`.
    fn fetch(&self, repo: &Path, source: &Path, refname: &str) -> Result<()>;

    /// Set (or add) the URL of a named remote.
    fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> Result<()>;

    /// Resolve a revision expression to a commit id.
    fn resolve_revision(&self, repo: &Path, rev: &str) -> Result<String>;

    /// Check out a commit, optionally as the named branch.
    fn checkout(&self, repo: &Path, revision: &str, branch: Option<&str>) -> Result<()>;

    /// Move a submodule's git directory into its superproject.
    fn absorb_git_dirs(&self, repo: &Path, path: &Path) -> Result<()>;

    /// Initialize and check out a submodule from its declared remote.
    fn submodule_update(&self, repo: &Path, path: &Path) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn submodule_init(&self, repo: &Path, path: &Path) -> Result<()> {
        crate::git::submodule_init(repo, path)
    }

    fn set_submodule_url(&self, repo: &Path, name: &str, url: &str) -> Result<()> {
        crate::git::set_submodule_url(repo, name, url)
    }

    fn clone_shared(&self, source: &Path, target: &Path) -> Result<()> {
        crate::git::clone_shared(source, target)
    }

    fn fetch(&self, repo: &Path, source: &Path, refname: &str) -> Result<()> {
        crate::git::fetch(repo, source, refname)
    }

    fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> Result<()> {
        crate::git::set_remote_url(repo, remote, url)
    }

    fn resolve_revision(&self, repo: &Path, rev: &str) -> Result<String> {
        crate::git::resolve_revision(repo, rev)
    }

    fn checkout(&self, repo: &Path, revision: &str, branch: Option<&str>) -> Result<()> {
        crate::git::checkout(repo, revision, branch)
    }

    fn absorb_git_dirs(&self, repo: &Path, path: &Path) -> Result<()> {
        crate::git::absorb_git_dirs(repo, path)
    }

    fn submodule_update(&self, repo: &Path, path: &Path) -> Result<()> {
        crate::git::submodule_update(repo, path)
    }
}
