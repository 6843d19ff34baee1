//! # Canonical Identity
//!
//! A submodule can name the same remote repository in many ways:
//!
//! - `ssh://review.example.org:29418/lib/foo`
//! - `https://review.example.org/lib/foo.git`
//! - `git@review.example.org:lib/foo.git`
//! - `../../lib/foo` (relative to the repository that declares it)
//!
//! The orchestrator, on the other hand, knows each project by a single
//! canonical name such as `review.example.org/lib/foo`. This module reduces
//! every URL form to a [`CanonicalIdentity`] (`hostname` + `name`) so that the
//! two sides can be joined.
//!
//! Normalization rules:
//! - the hostname is lower-cased; scheme, user and port are dropped
//! - duplicate slashes collapse, leading and trailing slashes are dropped
//! - a single trailing `.git` is stripped

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

/// `[user@]host:path`, the scp-like syntax git accepts for SSH remotes.
static SCP_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[^@/:]+@)?(?P<host>[^@/:\[\]]+):(?P<path>.*)$")
        .expect("scp-like URL regex is valid")
});

/// Normalized `(hostname, name)` pair identifying a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalIdentity {
    hostname: String,
    name: String,
}

impl CanonicalIdentity {
    /// Build an identity from a hostname and a repository path, normalizing
    /// both.
    pub fn new(hostname: &str, name: &str) -> Self {
        Self {
            hostname: hostname.trim().to_lowercase(),
            name: normalize_name(name),
        }
    }

    /// Build an identity from an orchestrator canonical name
    /// (`host/path/to/project`).
    ///
    /// `hostname_hint` is the manifest's `canonical_hostname`; when the
    /// canonical name starts with it, it is used as the split point so that
    /// hostnames containing a path-like prefix are handled. Otherwise the
    /// first path segment is the hostname.
    pub fn from_canonical_name(canonical_name: &str, hostname_hint: Option<&str>) -> Result<Self> {
        let trimmed = canonical_name.trim().trim_start_matches('/');

        if let Some(hint) = hostname_hint.filter(|h| !h.is_empty()) {
            if let Some(rest) = strip_prefix_ignore_case(trimmed, hint) {
                if rest.is_empty() || rest.starts_with('/') {
                    return Ok(Self::new(hint, rest));
                }
            }
        }

        let (host, path) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if host.is_empty() {
            return Err(Error::malformed_url(
                canonical_name,
                "canonical name has no hostname",
            ));
        }
        Ok(Self::new(host, path))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Repository path on the host, without leading slash or `.git` suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The SSH form of this identity, used as the remote of repointed
    /// submodules.
    pub fn ssh_url(&self) -> String {
        if self.name.is_empty() {
            format!("ssh://{}", self.hostname)
        } else {
            format!("ssh://{}/{}", self.hostname, self.name)
        }
    }
}

impl fmt::Display for CanonicalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.hostname)
        } else {
            write!(f, "{}/{}", self.hostname, self.name)
        }
    }
}

/// Resolve a submodule URL to its canonical identity.
///
/// `base` is the identity of the repository that declares the submodule. It
/// is required for relative references (`./x`, `../x`) and for host-less
/// paths, and ignored otherwise.
pub fn resolve(url: &str, base: Option<&CanonicalIdentity>) -> Result<CanonicalIdentity> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::malformed_url(url, "empty URL"));
    }

    if is_relative(url) {
        let base = base.ok_or_else(|| {
            Error::malformed_url(url, "relative URL without a containing repository")
        })?;
        return resolve_relative(url, base);
    }

    if url.contains("://") {
        let parsed = Url::parse(url).map_err(|e| Error::malformed_url(url, e.to_string()))?;
        return match parsed.host_str().filter(|h| !h.is_empty()) {
            Some(host) => Ok(CanonicalIdentity::new(host, parsed.path())),
            None => on_base_host(url, parsed.path(), base),
        };
    }

    if let Some(caps) = SCP_LIKE.captures(url) {
        return Ok(CanonicalIdentity::new(&caps["host"], &caps["path"]));
    }

    on_base_host(url, url, base)
}

fn is_relative(url: &str) -> bool {
    url == "." || url == ".." || url.starts_with("./") || url.starts_with("../")
}

/// Apply git's relative submodule URL rules: each `..` drops one trailing
/// component of the containing repository's path.
fn resolve_relative(url: &str, base: &CanonicalIdentity) -> Result<CanonicalIdentity> {
    let mut segments: Vec<&str> = base.name.split('/').filter(|s| !s.is_empty()).collect();

    for component in url.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::malformed_url(
                        url,
                        format!("relative URL climbs above the host root of {}", base),
                    ));
                }
            }
            other => segments.push(other),
        }
    }

    Ok(CanonicalIdentity::new(&base.hostname, &segments.join("/")))
}

fn on_base_host(
    url: &str,
    path: &str,
    base: Option<&CanonicalIdentity>,
) -> Result<CanonicalIdentity> {
    match base {
        Some(base) => Ok(CanonicalIdentity::new(&base.hostname, path)),
        None => Err(Error::malformed_url(url, "URL has no host component")),
    }
}

fn normalize_name(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    let stripped = joined.strip_suffix(".git").unwrap_or(&joined);
    stripped.trim_end_matches('/').to_string()
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}
