//! # Submodule Reconcile Library
//!
//! A CI orchestrator such as Zuul checks out every project a build depends
//! on, including speculative, not-yet-merged revisions. A repository that
//! pulls those same projects in as git submodules would normally fetch them
//! again from their remotes and silently build against the wrong revisions.
//! This library reconciles a repository's `.gitmodules` with the
//! orchestrator's manifest so that each submodule is bound to the checkout
//! the build already has.
//!
//! ## Quick Example
//!
//! ```
//! use submodule_reconcile::identity::{resolve, CanonicalIdentity};
//!
//! let base = CanonicalIdentity::new("review.example.org", "top/app");
//! let ssh = resolve("ssh://review.example.org:29418/lib/foo", None).unwrap();
//! let relative = resolve("../../lib/foo.git", Some(&base)).unwrap();
//!
//! assert_eq!(ssh, relative);
//! assert_eq!(ssh.to_string(), "review.example.org/lib/foo");
//! ```
//!
//! ## Core Concepts
//!
//! - **Identity (`identity`)**: reduces any submodule URL form to a
//!   `hostname/name` pair comparable with the orchestrator's canonical names.
//! - **Manifest (`manifest`)**: the orchestrator's project records.
//! - **Declarations (`gitmodules`)**: the submodules a repository declares.
//! - **Reconciliation (`reconcile`)**: decides, per submodule, whether to
//!   repoint it at an existing checkout, clone it, skip it or fail, and
//!   carries the decision out.
//! - **Git (`repository`, `git`)**: the `GitOperations` seam and its
//!   default implementation on top of the `git` binary.
//! - **Driver (`driver`)**: one run from manifest to printed report.

pub mod driver;
pub mod error;
pub mod git;
pub mod gitmodules;
pub mod identity;
pub mod manifest;
pub mod output;
pub mod reconcile;
pub mod repository;

#[cfg(test)]
mod identity_proptest;
