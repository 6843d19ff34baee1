//! Project lookup by canonical identity.

use std::collections::HashMap;

use log::warn;

use crate::error::Result;
use crate::identity::CanonicalIdentity;
use crate::manifest::ProjectRecord;

/// Project records keyed by canonical identity, in manifest order.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    records: Vec<(CanonicalIdentity, ProjectRecord)>,
    by_identity: HashMap<CanonicalIdentity, Vec<usize>>,
}

/// A successful lookup.
#[derive(Debug, Clone, Copy)]
pub struct ProjectMatch<'a> {
    pub identity: &'a CanonicalIdentity,
    /// The record that wins: first in manifest order.
    pub record: &'a ProjectRecord,
    /// Number of further records claiming the same identity.
    pub shadowed: usize,
}

impl ProjectIndex {
    /// Index `records`. Records that collide on canonical identity are kept,
    /// but only the first one is ever returned by [`ProjectIndex::lookup`].
    pub fn new(records: &[ProjectRecord]) -> Result<Self> {
        let mut index = Self::default();

        for record in records {
            let identity = record.identity()?;
            let slot = index.by_identity.entry(identity.clone()).or_default();
            if let Some(&first) = slot.first() {
                warn!(
                    "projects {} and {} share canonical identity {}; using {}",
                    index.records[first].1.canonical_name,
                    record.canonical_name,
                    identity,
                    index.records[first].1.canonical_name
                );
            }
            slot.push(index.records.len());
            index.records.push((identity, record.clone()));
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up the record for `identity`.
    pub fn lookup(&self, identity: &CanonicalIdentity) -> Option<ProjectMatch<'_>> {
        let slot = self.by_identity.get(identity)?;
        let (identity, record) = &self.records[*slot.first()?];
        Some(ProjectMatch {
            identity,
            record,
            shadowed: slot.len() - 1,
        })
    }

    /// A required project with the same repository path as `identity` but on
    /// another host, if any. Such a submodule points at a different remote
    /// (for instance a mirror) of a project the build depends on.
    pub fn required_elsewhere(&self, identity: &CanonicalIdentity) -> Option<&ProjectRecord> {
        self.records
            .iter()
            .find(|(candidate, record)| {
                record.required
                    && candidate.name() == identity.name()
                    && candidate.hostname() != identity.hostname()
            })
            .map(|(_, record)| record)
    }
}
