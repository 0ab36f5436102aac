//! Package archive inspection
//!
//! Two seams the cache depends on but does not implement itself:
//!
//! - [`ArchiveReader`] turns archive bytes into a [`PackageManifest`]
//! - [`HashProvider`] digests archive bytes for the feed's content hash
//!
//! The defaults are [`NupkgReader`] (zip + nuspec) and [`Sha512Hasher`].

pub mod hash;
pub mod nupkg;

pub use hash::{HashProvider, Sha512Hasher};
pub use nupkg::NupkgReader;

use crate::error::FeedResult;
use crate::package::PackageManifest;
use std::path::Path;

/// File extension of package archives, without the dot
pub const ARCHIVE_EXTENSION: &str = "nupkg";

/// Parses package archives
pub trait ArchiveReader: Send + Sync {
    /// Read identity, listing flag and framework data from archive bytes.
    ///
    /// `origin` is used for error reporting only. Malformed input must fail
    /// with [`crate::error::FeedError::CorruptArchive`].
    fn read_manifest(&self, origin: &Path, bytes: &[u8]) -> FeedResult<PackageManifest>;
}
