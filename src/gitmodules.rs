//! # Submodule Declarations
//!
//! Reads a repository's `.gitmodules` file into an ordered list of
//! [`SubmoduleEntry`] values. The file is git-config syntax, which is close
//! enough to INI that `rust-ini` parses it:
//!
//! ```text
//! [submodule "deps/foo"]
//!     path = deps/foo
//!     url = ../../lib/foo
//!     branch = stable
//! ```
//!
//! Every `submodule` section must carry `path` and `url`; `branch` is
//! optional. Sections of any other kind are ignored. Declaration order is
//! kept so that reports are deterministic.
//!
//! Where git-config and INI differ, git wins: section kinds and keys are
//! case-insensitive, sections repeating a name are merged, and values follow
//! git's quoting and comment rules.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use ini::{Ini, ParseOption};

use crate::error::{Error, Result};

/// File name of the submodule declaration file at a repository root.
pub const DECLARATION_FILE: &str = ".gitmodules";

/// One `[submodule "<name>"]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleEntry {
    /// Section label, used to address `submodule.<name>.*` config keys.
    pub name: String,
    /// Location of the submodule relative to the declaring repository.
    pub path: PathBuf,
    /// Declared remote: absolute, scp-like or relative.
    pub url: String,
    pub branch: Option<String>,
}

/// Read the declaration file at `path`.
///
/// Returns `DeclarationNotFound` when the file is absent so that callers can
/// decide whether that means "no submodules".
pub fn read(path: &Path) -> Result<Vec<SubmoduleEntry>> {
    if !path.is_file() {
        return Err(Error::DeclarationNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse(&content, path)
}

/// Read `<repo_root>/.gitmodules`, treating an absent file as no submodules.
pub fn read_optional(repo_root: &Path) -> Result<Vec<SubmoduleEntry>> {
    match read(&repo_root.join(DECLARATION_FILE)) {
        Err(Error::DeclarationNotFound { .. }) => Ok(Vec::new()),
        other => other,
    }
}

/// Parse declaration file content. `origin` is only used in error messages.
pub fn parse(content: &str, origin: &Path) -> Result<Vec<SubmoduleEntry>> {
    let parse_error = |message: String| Error::DeclarationParse {
        path: origin.to_path_buf(),
        message,
    };

    // Quotes, escapes and inline comments follow git-config rules and are
    // handled by `config_value`, so rust-ini hands over the raw text.
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    // Indented comment lines are blanked; rust-ini only accepts comments in
    // the first column.
    let content = content
        .lines()
        .map(|line| {
            if line.trim_start().starts_with(['#', ';']) {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let ini = Ini::load_from_str_opt(&content, options).map_err(|e| parse_error(e.to_string()))?;

    let mut entries = Vec::new();
    let mut seen_paths = HashSet::new();

    for (name, section) in merge_sections(&ini) {
        let path = section
            .path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| parse_error(format!("submodule \"{}\" has no path", name)))?;
        let url = section
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| parse_error(format!("submodule \"{}\" has no url", name)))?;

        let path = PathBuf::from(path.trim_end_matches('/'));
        if !is_contained(&path) {
            return Err(parse_error(format!(
                "submodule \"{}\" path {} must stay inside the repository",
                name,
                path.display()
            )));
        }
        if !seen_paths.insert(path.clone()) {
            return Err(parse_error(format!(
                "duplicate submodule path {}",
                path.display()
            )));
        }

        entries.push(SubmoduleEntry {
            name,
            path,
            url,
            branch: section.branch.filter(|b| !b.is_empty()),
        });
    }

    Ok(entries)
}

/// The keys of one submodule, gathered from every section with its name.
#[derive(Default)]
struct SectionKeys {
    path: Option<String>,
    url: Option<String>,
    branch: Option<String>,
}

/// Group `submodule` sections by name in order of first appearance. Keys are
/// case-insensitive and a later value overrides an earlier one, as with
/// `git config --get`.
fn merge_sections(ini: &Ini) -> Vec<(String, SectionKeys)> {
    let mut merged: Vec<(String, SectionKeys)> = Vec::new();

    for (section, properties) in ini.iter() {
        let Some(name) = section.and_then(submodule_name) else {
            continue;
        };
        let index = match merged.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                merged.push((name.to_string(), SectionKeys::default()));
                merged.len() - 1
            }
        };
        let keys = &mut merged[index].1;

        for (key, raw) in properties.iter() {
            let slot = if key.eq_ignore_ascii_case("path") {
                &mut keys.path
            } else if key.eq_ignore_ascii_case("url") {
                &mut keys.url
            } else if key.eq_ignore_ascii_case("branch") {
                &mut keys.branch
            } else {
                continue;
            };
            *slot = Some(config_value(raw));
        }
    }

    merged
}

/// Interpret a raw git-config value: double quotes group text and are
/// dropped, `#` or `;` outside quotes starts a comment, backslash escapes
/// are decoded and surrounding whitespace outside quotes is trimmed.
fn config_value(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    // Length of `value` that must survive trimming (ends after quoted text).
    let mut kept = 0;
    let mut quoted = false;
    let mut chars = raw.trim_start().chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                kept = value.len();
            }
            '#' | ';' if !quoted => break,
            '\\' => {
                match chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('b') => {
                        value.pop();
                    }
                    Some(other) => value.push(other),
                    None => value.push('\\'),
                }
                kept = value.len();
            }
            c => {
                value.push(c);
                if quoted {
                    kept = value.len();
                }
            }
        }
    }

    let trimmed = value[kept..].trim_end().len();
    value.truncate(kept + trimmed);
    value
}

/// `submodule "deps/foo"` -> `deps/foo`; the section kind is
/// case-insensitive.
fn submodule_name(section: &str) -> Option<&str> {
    let section = section.trim();
    let (kind, rest) = section.split_at_checked("submodule".len())?;
    if !kind.eq_ignore_ascii_case("submodule") || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest.trim().trim_matches('"');
    (!name.is_empty()).then_some(name)
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
