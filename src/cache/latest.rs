//! Latest-version resolution
//!
//! Per package id (case-insensitive) two running selections are kept:
//! the highest version of any kind and the highest release version.
//! A candidate replaces the incumbent only when strictly greater, so among
//! equal versions the first one observed wins.

use crate::package::PackageIdentity;
use std::collections::HashMap;
use tracing::warn;

/// Flags assigned to one scanned entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatestFlags {
    pub is_latest_version: bool,
    pub is_absolute_latest_version: bool,
}

#[derive(Debug, Default)]
struct Selection {
    best_any: Option<(usize, PackageIdentity)>,
    best_release: Option<(usize, PackageIdentity)>,
}

/// Folds scanned identities into per-id winners
///
/// Entries are referred to by the index the caller assigns when observing
/// them; `finish` maps winning indices to their flags.
#[derive(Debug, Default)]
pub struct LatestVersionResolver {
    selections: HashMap<String, Selection>,
}

impl LatestVersionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one entry
    pub fn observe(&mut self, index: usize, identity: &PackageIdentity) {
        let selection = self
            .selections
            .entry(identity.id.key().to_string())
            .or_default();

        replace_if_greater(&mut selection.best_any, index, identity);
        if identity.version.is_release() {
            replace_if_greater(&mut selection.best_release, index, identity);
        }
    }

    /// Number of distinct package ids observed
    pub fn id_count(&self) -> usize {
        self.selections.len()
    }

    /// Winning indices and their flags. Indices absent from the map get
    /// both flags false.
    pub fn finish(self) -> HashMap<usize, LatestFlags> {
        let mut flags: HashMap<usize, LatestFlags> = HashMap::new();

        for selection in self.selections.into_values() {
            if let Some((index, _)) = selection.best_any {
                flags.entry(index).or_default().is_absolute_latest_version = true;
            }
            if let Some((index, _)) = selection.best_release {
                flags.entry(index).or_default().is_latest_version = true;
            }
        }

        flags
    }
}

fn replace_if_greater(
    slot: &mut Option<(usize, PackageIdentity)>,
    index: usize,
    candidate: &PackageIdentity,
) {
    match slot {
        Some((_, incumbent)) if candidate.version > incumbent.version => {
            *slot = Some((index, candidate.clone()));
        }
        Some((_, incumbent)) if candidate.version == incumbent.version => {
            warn!(
                "Duplicate package {} in storage; keeping the first one scanned",
                candidate
            );
        }
        Some(_) => {}
        None => *slot = Some((index, candidate.clone())),
    }
}
