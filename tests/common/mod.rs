//! Shared test utilities for E2E tests.
//!
//! Add `mod common;` to a test file, then build a build directory with
//! [`TestFixture`]:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new()
//!     .with_project("git.example.org/top/app", false)
//!     .with_gitmodules("git.example.org/top/app", gitmodules::FOO_AND_BAR);
//! fixture.command().arg("--dry-run").assert().success();
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::gitmodules;
    #[allow(unused_imports)]
    pub use super::{git, git_available, init_repo};
    pub use super::TestFixture;
}

/// `.gitmodules` snippets shared by several tests.
#[allow(dead_code)]
pub mod gitmodules {
    /// `deps/foo` relative to the super project, `deps/bar` absolute.
    pub const FOO_AND_BAR: &str = r#"[submodule "deps/foo"]
	path = deps/foo
	url = ../../lib/foo.git
[submodule "deps/bar"]
	path = deps/bar
	url = https://git.example.org/lib/bar.git
"#;

    /// A mirror URL for a project the build may require.
    pub const BAZ_FROM_MIRROR: &str = r#"[submodule "deps/baz"]
	path = deps/baz
	url = https://mirror.example.com/lib/baz.git
"#;

    pub const NESTED_QUX: &str = r#"[submodule "sub/qux"]
	path = sub/qux
	url = ../qux
"#;
}

/// Whether a `git` binary can be run.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// Run git in `dir` with a fixed committer and return its trimmed stdout.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a repository on `main` with one commit holding `files`.
#[allow(dead_code)]
pub fn init_repo(dir: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).expect("Failed to create repository directory");
    git(dir, &["init", "--quiet", "-b", "main"]);
    for (path, content) in files {
        let file = dir.join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file, content).expect("Failed to write file");
    }
    git(dir, &["add", "."]);
    git(dir, &["commit", "--quiet", "--allow-empty", "-m", "Initial commit"]);
}

/// A temporary build directory: a manifest plus one source directory per
/// project under `src/<canonical name>`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
    projects: Vec<(String, bool)>,
    relative_sources: bool,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
            projects: Vec::new(),
            relative_sources: false,
        }
    }

    /// Add a project with a checked-out work tree.
    pub fn with_project(mut self, name: &str, required: bool) -> Self {
        self.temp_dir
            .child(format!("src/{}/.git", name))
            .create_dir_all()
            .expect("Failed to create project");
        self.projects.push((name.to_string(), required));
        self.write_manifest();
        self
    }

    /// Add a project whose source directory is a real repository with one
    /// commit holding `files`.
    pub fn with_git_project(mut self, name: &str, required: bool, files: &[(&str, &str)]) -> Self {
        init_repo(&self.src(name), files);
        self.projects.push((name.to_string(), required));
        self.write_manifest();
        self
    }

    /// Record `commit` as a submodule at `path` in a project's index and
    /// commit it, leaving the submodule uninitialized like a fresh checkout.
    pub fn with_gitlink(self, name: &str, path: &str, commit: &str) -> Self {
        let dir = self.src(name);
        let cacheinfo = format!("160000,{},{}", commit, path);
        let message = format!("Add {}", path);
        git(&dir, &["update-index", "--add", "--cacheinfo", cacheinfo.as_str()]);
        git(&dir, &["commit", "--quiet", "-m", message.as_str()]);
        self
    }

    /// Write `src_dir` entries relative to the fixture directory.
    pub fn with_relative_sources(mut self) -> Self {
        self.relative_sources = true;
        self.write_manifest();
        self
    }

    /// Add a project whose source directory was never checked out.
    pub fn with_missing_project(mut self, name: &str, required: bool) -> Self {
        self.projects.push((name.to_string(), required));
        self.write_manifest();
        self
    }

    /// Write `.gitmodules` into a project's source directory.
    pub fn with_gitmodules(self, name: &str, content: &str) -> Self {
        self.temp_dir
            .child(format!("src/{}/.gitmodules", name))
            .write_str(content)
            .expect("Failed to write .gitmodules");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn src(&self, name: &str) -> PathBuf {
        self.path().join("src").join(name)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join("zuul.json")
    }

    fn write_manifest(&self) {
        let projects: serde_json::Map<String, serde_json::Value> = self
            .projects
            .iter()
            .map(|(name, required)| {
                let hostname = name.split('/').next().unwrap_or_default();
                let src_dir = if self.relative_sources {
                    Path::new("src").join(name)
                } else {
                    self.src(name)
                };
                (
                    name.clone(),
                    serde_json::json!({
                        "canonical_name": name,
                        "canonical_hostname": hostname,
                        "src_dir": src_dir,
                        "required": required,
                    }),
                )
            })
            .collect();
        let document = serde_json::json!({ "projects": projects });
        self.temp_dir
            .child("zuul.json")
            .write_str(&serde_json::to_string_pretty(&document).expect("Failed to encode"))
            .expect("Failed to write manifest");
    }

    /// A command with the manifest argument filled in, running in the
    /// fixture directory with colors and ambient configuration disabled.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("submodule-reconcile");
        cmd.current_dir(self.path())
            .env_remove("SUBMODULE_RECONCILE_LOG")
            .arg("--color")
            .arg("never")
            .arg(self.manifest_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_manifest() {
        let fixture = TestFixture::new().with_project("git.example.org/lib/foo", true);
        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(fixture.manifest_path()).unwrap())
                .unwrap();
        assert_eq!(
            manifest["projects"]["git.example.org/lib/foo"]["required"],
            serde_json::Value::Bool(true)
        );
        assert!(fixture.src("git.example.org/lib/foo").join(".git").is_dir());
    }
}
