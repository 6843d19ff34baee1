//! # Build Context Manifest
//!
//! The orchestrator hands the build a JSON document describing every project
//! it has already checked out. Only the `projects` mapping is read:
//!
//! ```json
//! {
//!   "projects": {
//!     "git.example.org/lib/foo": {
//!       "canonical_name": "git.example.org/lib/foo",
//!       "canonical_hostname": "git.example.org",
//!       "src_dir": "src/git.example.org/lib/foo",
//!       "required": true
//!     }
//!   }
//! }
//! ```
//!
//! The raw inventory variable (`{"zuul": {"projects": {...}}}`) is accepted
//! as well. Project order in the document is preserved; it decides which
//! record wins when two records share a canonical identity.

use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identity::CanonicalIdentity;

/// One project the orchestrator materialized for this build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectRecord {
    /// `host/path` name, unique within a build. Falls back to the mapping key
    /// when the value omits it.
    #[serde(default)]
    pub canonical_name: String,
    pub canonical_hostname: String,
    /// Where the orchestrator checked the project out. Relative paths are
    /// relative to the working directory of the run.
    #[serde(rename = "src_dir")]
    pub source_directory: PathBuf,
    /// Whether the project was declared as a dependency of the build.
    #[serde(default)]
    pub required: bool,
}

impl ProjectRecord {
    /// The canonical identity used to match submodule URLs against this
    /// record.
    pub fn identity(&self) -> Result<CanonicalIdentity> {
        CanonicalIdentity::from_canonical_name(&self.canonical_name, Some(&self.canonical_hostname))
    }
}

#[derive(Deserialize)]
struct Document {
    projects: Option<Map<String, Value>>,
    zuul: Option<Inventory>,
}

#[derive(Deserialize)]
struct Inventory {
    projects: Map<String, Value>,
}

/// The parsed manifest: project records in document order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    projects: Vec<ProjectRecord>,
}

impl Manifest {
    pub fn new(projects: Vec<ProjectRecord>) -> Self {
        Self { projects }
    }

    /// Parse a manifest from JSON text.
    pub fn parse(content: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(content)?;
        let projects = match (document.projects, document.zuul) {
            (Some(projects), _) => projects,
            (None, Some(inventory)) => inventory.projects,
            (None, None) => {
                return Err(serde_json::Error::custom("no `projects` mapping in manifest").into())
            }
        };

        let mut records = Vec::with_capacity(projects.len());
        for (key, value) in projects {
            let mut record: ProjectRecord = serde_json::from_value(value).map_err(|e| {
                serde_json::Error::custom(format!("project {}: {}", key, e))
            })?;
            if record.canonical_name.is_empty() {
                record.canonical_name = key;
            }
            record
                .identity()
                .map_err(|e| serde_json::Error::custom(e.to_string()))?;
            records.push(record);
        }

        Ok(Self::new(records))
    }

    /// Load a manifest file. Any failure is reported as `ManifestLoad`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |message: String| Error::ManifestLoad {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        Self::parse(&content)
            .and_then(Self::with_absolute_sources)
            .map_err(|e| load_error(e.to_string()))
    }

    /// Resolve every relative `src_dir` against the current directory.
    pub fn with_absolute_sources(mut self) -> Result<Self> {
        for record in &mut self.projects {
            if record.source_directory.is_relative() {
                record.source_directory = std::path::absolute(&record.source_directory)?;
            }
        }
        Ok(self)
    }

    /// All records in document order.
    pub fn projects(&self) -> &[ProjectRecord] {
        &self.projects
    }

    /// Find a project by its canonical name.
    pub fn find(&self, canonical_name: &str) -> Option<&ProjectRecord> {
        self.projects
            .iter()
            .find(|p| p.canonical_name == canonical_name)
    }

    /// All records except the named one, in document order.
    pub fn without(&self, canonical_name: &str) -> Vec<ProjectRecord> {
        self.projects
            .iter()
            .filter(|p| p.canonical_name != canonical_name)
            .cloned()
            .collect()
    }
}
