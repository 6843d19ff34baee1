//! Thin wrappers around the system `git` binary.
//!
//! Using the installed `git` means SSH keys, credential helpers and any
//! configuration in `~/.gitconfig` apply exactly as they would for a manual
//! checkout. Every wrapper is synchronous and returns `Error::GitCommand`
//! with git's stderr when the command fails.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Run `git -C <dir> <args...>` and return its trimmed stdout.
fn run_git<I, S>(dir: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let command = args
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    debug!("git -C {} {}", dir.display(), command);

    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(&args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            dir: dir.to_path_buf(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command,
            dir: dir.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether `dir` is the top of a git work tree (`.git` is a directory, or a
/// gitdir file as left behind by `absorbgitdirs`).
pub fn is_work_tree(dir: &Path) -> bool {
    dir.is_dir() && dir.join(".git").exists()
}

/// `git submodule init -- <path>`
pub fn submodule_init(repo: &Path, path: &Path) -> Result<()> {
    run_git(
        repo,
        [
            OsStr::new("submodule"),
            OsStr::new("init"),
            OsStr::new("--"),
            path.as_os_str(),
        ],
    )?;
    Ok(())
}

/// Point `submodule.<name>.url` in the repository's local config at `url`.
pub fn set_submodule_url(repo: &Path, name: &str, url: &str) -> Result<()> {
    run_git(repo, ["config", format!("submodule.{}.url", name).as_str(), url])?;
    Ok(())
}

/// Clone `source` into `target` sharing its object store through git
/// alternates, so nothing is copied and nothing is fetched over the network.
///
/// `target` may exist as long as it is empty. A relative `target` is taken
/// relative to the current directory, never to its own parent.
pub fn clone_shared(source: &Path, target: &Path) -> Result<()> {
    let source = std::fs::canonicalize(source)?;
    let target = std::path::absolute(target)?;
    let parent = target.parent().unwrap_or(&target);
    std::fs::create_dir_all(parent)?;

    let args = [
        OsStr::new("clone"),
        OsStr::new("--quiet"),
        OsStr::new("--shared"),
        OsStr::new("--no-checkout"),
        source.as_os_str(),
        target.as_os_str(),
    ];
    run_git(parent, args)?;

    if !is_work_tree(&target) {
        return Err(Error::GitCommand {
            command: args.map(OsStr::to_string_lossy).join(" "),
            dir: parent.to_path_buf(),
            stderr: format!("no work tree at {} after cloning", target.display()),
        });
    }
    Ok(())
}

/// Fetch `refname` from a local `source` repository into `repo`.
pub fn fetch(repo: &Path, source: &Path, refname: &str) -> Result<()> {
    let source = std::fs::canonicalize(source)?;
    run_git(
        repo,
        [
            OsStr::new("fetch"),
            OsStr::new("--quiet"),
            source.as_os_str(),
            OsStr::new(refname),
        ],
    )?;
    Ok(())
}

/// Set the URL of `remote`, adding the remote if it does not exist yet.
pub fn set_remote_url(repo: &Path, remote: &str, url: &str) -> Result<()> {
    let remotes = run_git(repo, ["remote"])?;
    if remotes.lines().any(|r| r.trim() == remote) {
        run_git(repo, ["remote", "set-url", remote, url])?;
    } else {
        run_git(repo, ["remote", "add", remote, url])?;
    }
    Ok(())
}

/// Resolve `rev` to a full commit id.
pub fn resolve_revision(repo: &Path, rev: &str) -> Result<String> {
    run_git(
        repo,
        ["rev-parse", "--verify", format!("{}^{{commit}}", rev).as_str()],
    )
}

/// Check out `revision`. With a branch name, the branch is (re)created at
/// `revision`; otherwise HEAD is detached.
pub fn checkout(repo: &Path, revision: &str, branch: Option<&str>) -> Result<()> {
    match branch {
        Some(branch) => run_git(repo, ["checkout", "--quiet", "-B", branch, revision])?,
        None => run_git(repo, ["checkout", "--quiet", "--detach", revision])?,
    };
    Ok(())
}

/// Move the submodule's `.git` directory into the superproject's
/// `.git/modules`.
pub fn absorb_git_dirs(repo: &Path, path: &Path) -> Result<()> {
    run_git(
        repo,
        [
            OsStr::new("submodule"),
            OsStr::new("absorbgitdirs"),
            OsStr::new("--"),
            path.as_os_str(),
        ],
    )?;
    Ok(())
}

/// `git submodule update --init -- <path>`
pub fn submodule_update(repo: &Path, path: &Path) -> Result<()> {
    run_git(
        repo,
        [
            OsStr::new("submodule"),
            OsStr::new("update"),
            OsStr::new("--init"),
            OsStr::new("--"),
            path.as_os_str(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_is_work_tree_with_git_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();
        assert!(is_work_tree(temp_dir.path()));
    }

    #[test]
    fn test_is_work_tree_with_gitdir_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(".git"),
            "gitdir: ../.git/modules/foo\n",
        )
        .unwrap();
        assert!(is_work_tree(temp_dir.path()));
    }

    #[test]
    fn test_is_work_tree_plain_or_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!is_work_tree(temp_dir.path()));
        assert!(!is_work_tree(&temp_dir.path().join("missing")));
    }

    #[test]
    fn test_git_command_failure_is_wrapped() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("not-a-repo");

        let err = submodule_init(&missing, Path::new("deps/foo")).unwrap_err();
        match err {
            Error::GitCommand { command, dir, .. } => {
                assert_eq!(command, "submodule init -- deps/foo");
                assert_eq!(dir, missing);
            }
            other => panic!("expected GitCommand, got {:?}", other),
        }
    }

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    /// A repository with one commit on `main`.
    fn init_repo(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        let git = |args: &[&str]| {
            let status = Command::new("git")
                .arg("-C")
                .arg(dir)
                .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
                .args(["-c", "commit.gpgsign=false"])
                .args(args)
                .output()
                .unwrap()
                .status;
            assert!(status.success(), "git {:?} failed", args);
        };
        git(&["init", "--quiet", "-b", "main"]);
        fs::write(dir.join("README"), "hello\n").unwrap();
        git(&["add", "README"]);
        git(&["commit", "--quiet", "-m", "Initial commit"]);
    }

    #[test]
    fn test_clone_shared_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = clone_shared(
            &temp_dir.path().join("missing"),
            &temp_dir.path().join("target"),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_clone_shared_relative_target_lands_in_current_dir() {
        if !git_available() {
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        init_repo(&source);

        let relative = PathBuf::from(format!(
            "target/{}/deps/foo",
            temp_dir.path().file_name().unwrap().to_string_lossy()
        ));
        let expected = std::env::current_dir().unwrap().join(&relative);
        clone_shared(&source, &relative).unwrap();

        assert!(is_work_tree(&expected));
        assert!(!expected.join("deps/foo").exists());
        fs::remove_dir_all(expected.parent().unwrap().parent().unwrap()).unwrap();
    }

    #[test]
    fn test_set_remote_url_adds_then_updates() {
        if !git_available() {
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        init_repo(&repo);

        set_remote_url(&repo, "origin", "ssh://git.example.org/lib/foo").unwrap();
        assert_eq!(
            run_git(&repo, ["remote", "get-url", "origin"]).unwrap(),
            "ssh://git.example.org/lib/foo"
        );

        set_remote_url(&repo, "origin", "ssh://git.example.org/lib/bar").unwrap();
        assert_eq!(
            run_git(&repo, ["remote", "get-url", "origin"]).unwrap(),
            "ssh://git.example.org/lib/bar"
        );
    }

    #[test]
    fn test_set_remote_url_reports_the_failing_command() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("not-a-repo");

        match set_remote_url(&missing, "origin", "ssh://git.example.org/lib/foo").unwrap_err() {
            Error::GitCommand { command, dir, .. } => {
                assert_eq!(command, "remote");
                assert_eq!(dir, missing);
            }
            other => panic!("expected GitCommand, got {:?}", other),
        }
    }
}
