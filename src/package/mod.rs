//! Package model
//!
//! A [`Package`] is one load of one archive. Two loads of the same file are
//! different packages: each carries its own [`LoadHandle`], and the cache keys
//! everything by that handle rather than by `(id, version)`.

pub mod framework;
pub mod identity;
pub mod metadata;

pub use framework::{FrameworkFamily, TargetFramework};
pub use identity::{PackageId, PackageIdentity, PackageVersion};
pub use metadata::DerivedMetadata;

use crate::archive::ArchiveReader;
use crate::error::{FeedError, FeedResult};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque per-load sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LoadHandle(u64);

impl LoadHandle {
    /// Draw the next handle from the process-wide sequence
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw sequence value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything an archive says about itself
#[derive(Debug, Clone, Serialize)]
pub struct PackageManifest {
    pub identity: PackageIdentity,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    /// Listing flag as authored; storage may override it when delisting is on
    pub listed: bool,
    /// `None` when the archive carries no framework information
    pub supported_frameworks: Option<BTreeSet<TargetFramework>>,
}

impl PackageManifest {
    /// Minimal manifest with only an identity
    pub fn new(identity: PackageIdentity) -> Self {
        Self {
            identity,
            title: None,
            description: None,
            summary: None,
            authors: Vec::new(),
            tags: Vec::new(),
            listed: true,
            supported_frameworks: None,
        }
    }
}

/// Where a package's bytes live
#[derive(Debug, Clone)]
pub enum PackageContent {
    /// Archive in storage, path relative to the storage root
    Stored(PathBuf),
    /// Bytes held in memory (uploads)
    Memory(Arc<[u8]>),
}

/// One loaded package
#[derive(Debug)]
pub struct Package {
    handle: LoadHandle,
    manifest: PackageManifest,
    listed: bool,
    content: PackageContent,
}

impl Package {
    /// Package produced by a storage scan
    pub fn stored(manifest: PackageManifest, listed: bool, relative_path: PathBuf) -> Self {
        Self {
            handle: LoadHandle::next(),
            manifest,
            listed,
            content: PackageContent::Stored(relative_path),
        }
    }

    /// Parse an uploaded archive held in memory
    pub fn from_bytes(
        reader: &dyn ArchiveReader,
        origin: &Path,
        bytes: Vec<u8>,
    ) -> FeedResult<Self> {
        let manifest = reader.read_manifest(origin, &bytes)?;
        Ok(Self::uploaded(manifest, bytes.into()))
    }

    /// Package for already parsed upload bytes
    pub fn uploaded(manifest: PackageManifest, bytes: Arc<[u8]>) -> Self {
        Self {
            handle: LoadHandle::next(),
            listed: manifest.listed,
            manifest,
            content: PackageContent::Memory(bytes),
        }
    }

    /// Load an archive file from the local file system
    pub async fn from_file(reader: &dyn ArchiveReader, path: &Path) -> FeedResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FeedError::io(format!("reading package {}", path.display()), e))?;
        Self::from_bytes(reader, path, bytes)
    }

    pub fn handle(&self) -> LoadHandle {
        self.handle
    }

    pub fn identity(&self) -> &PackageIdentity {
        &self.manifest.identity
    }

    pub fn id(&self) -> &PackageId {
        &self.manifest.identity.id
    }

    pub fn version(&self) -> &PackageVersion {
        &self.manifest.identity.version
    }

    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    /// Effective listing state
    pub fn is_listed(&self) -> bool {
        self.listed
    }

    pub fn is_prerelease(&self) -> bool {
        self.version().is_prerelease()
    }

    pub fn content(&self) -> &PackageContent {
        &self.content
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Package {}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.manifest.identity)
    }
}
