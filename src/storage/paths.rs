//! Package identity to storage path mapping

use crate::archive::ARCHIVE_EXTENSION;
use crate::package::PackageIdentity;
use std::path::PathBuf;

/// Deterministic mapping from identity to a path relative to the storage root
pub trait PathResolver: Send + Sync {
    fn package_path(&self, identity: &PackageIdentity) -> PathBuf;
}

/// `<id>.<version>.nupkg` directly under the root, id lowercased so that
/// identities differing only in case share one file
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatPathResolver;

impl PathResolver for FlatPathResolver {
    fn package_path(&self, identity: &PackageIdentity) -> PathBuf {
        PathBuf::from(format!(
            "{}.{}.{}",
            identity.id.key(),
            identity.version.normalized(),
            ARCHIVE_EXTENSION
        ))
    }
}
