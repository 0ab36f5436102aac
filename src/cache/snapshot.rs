//! Published cache snapshots

use crate::package::{DerivedMetadata, LoadHandle, Package, PackageVersion};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One package paired with its derived metadata
#[derive(Debug, Clone, Serialize)]
pub struct CachedPackage {
    #[serde(serialize_with = "serialize_manifest")]
    pub package: Arc<Package>,
    pub metadata: DerivedMetadata,
}

fn serialize_manifest<S: serde::Serializer>(
    package: &Arc<Package>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    package.manifest().serialize(serializer)
}

/// A fully built, internally consistent view of storage
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    built_at: DateTime<Utc>,
    entries: BTreeMap<LoadHandle, CachedPackage>,
}

impl Snapshot {
    pub(crate) fn new(generation: u64, entries: Vec<CachedPackage>) -> Self {
        Self {
            generation,
            built_at: Utc::now(),
            entries: entries
                .into_iter()
                .map(|entry| (entry.package.handle(), entry))
                .collect(),
        }
    }

    /// Rebuild counter of the owning cache at publish time
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in load order
    pub fn iter(&self) -> impl Iterator<Item = &CachedPackage> {
        self.entries.values()
    }

    /// Look up the entry for one loaded package instance
    pub fn get(&self, handle: LoadHandle) -> Option<&CachedPackage> {
        self.entries.get(&handle)
    }

    /// Exact identity match
    pub fn find(&self, id: &str, version: &PackageVersion) -> Option<&CachedPackage> {
        self.iter()
            .find(|entry| entry.package.id().matches(id) && entry.package.version() == version)
    }

    /// All versions of one id, lowest first
    pub fn find_by_id(&self, id: &str) -> Vec<&CachedPackage> {
        let mut found: Vec<_> = self
            .iter()
            .filter(|entry| entry.package.id().matches(id))
            .collect();
        found.sort_by(|a, b| a.package.version().cmp(b.package.version()));
        found
    }

    /// Entries sorted by id, then version
    pub fn sorted(&self) -> Vec<&CachedPackage> {
        let mut all: Vec<_> = self.iter().collect();
        all.sort_by(|a, b| a.package.identity().cmp(b.package.identity()));
        all
    }
}
