//! Storage scan: per-archive derived metadata, computed with bounded parallelism
//!
//! Each work item opens one archive, reads it to the end exactly once, closes
//! it, then parses and hashes the bytes on the blocking pool. At most
//! `concurrency` items are in flight, which caps open handles and buffered
//! archive bytes. The first failure aborts the whole scan.

use super::latest::LatestVersionResolver;
use super::snapshot::CachedPackage;
use crate::archive::{ArchiveReader, HashProvider, ARCHIVE_EXTENSION};
use crate::error::{FeedError, FeedResult};
use crate::package::{DerivedMetadata, Package};
use crate::storage::StorageBackend;
use futures_util::stream::{self, StreamExt};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Settings that change what a scan records
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub enable_delisting: bool,
    pub enable_framework_filtering: bool,
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            enable_delisting: false,
            enable_framework_filtering: false,
            concurrency: 4,
        }
    }
}

/// Computes [`DerivedMetadata`] for archives in storage
pub struct MetadataComputer {
    storage: Arc<dyn StorageBackend>,
    reader: Arc<dyn ArchiveReader>,
    hasher: Arc<dyn HashProvider>,
    options: ScanOptions,
}

impl MetadataComputer {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        reader: Arc<dyn ArchiveReader>,
        hasher: Arc<dyn HashProvider>,
        options: ScanOptions,
    ) -> Self {
        Self {
            storage,
            reader,
            hasher,
            options,
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Load one archive and compute its metadata. Latest-version flags are
    /// left false.
    pub async fn compute(&self, relative: PathBuf) -> FeedResult<CachedPackage> {
        let full_path = self.storage.full_path(&relative);

        let mut bytes = Vec::new();
        {
            let mut stream = self.storage.open_read(&relative).await?;
            stream
                .read_to_end(&mut bytes)
                .await
                .map_err(|e| FeedError::io(format!("reading {}", full_path.display()), e))?;
        }
        let size_bytes = bytes.len() as u64;

        let reader = Arc::clone(&self.reader);
        let hasher = Arc::clone(&self.hasher);
        let origin = full_path.clone();
        let (manifest, content_hash_base64) = tokio::task::spawn_blocking(move || {
            let manifest = reader.read_manifest(&origin, &bytes)?;
            let hash = hasher
                .digest_base64(&mut Cursor::new(&bytes))
                .map_err(|e| FeedError::io(format!("hashing {}", origin.display()), e))?;
            Ok::<_, FeedError>((manifest, hash))
        })
        .await
        .map_err(|e| FeedError::Internal(format!("scan worker failed: {}", e)))??;

        let listed = if self.options.enable_delisting {
            !self.storage.is_hidden(&relative).await?
        } else {
            manifest.listed
        };

        let times = self.storage.times(&relative).await?;

        let supported_frameworks = if self.options.enable_framework_filtering {
            manifest.supported_frameworks.clone()
        } else {
            None
        };

        let metadata = DerivedMetadata {
            size_bytes,
            content_hash_base64,
            created_at: times.created,
            last_modified_at: times.modified,
            relative_path: relative.clone(),
            full_path,
            is_latest_version: false,
            is_absolute_latest_version: false,
            supported_frameworks,
        };

        debug!("Scanned {} ({} bytes)", manifest.identity, size_bytes);

        Ok(CachedPackage {
            package: Arc::new(Package::stored(manifest, listed, relative)),
            metadata,
        })
    }

    /// Scan every archive in storage and resolve latest-version flags
    pub async fn scan(&self) -> FeedResult<Vec<CachedPackage>> {
        let started = Instant::now();
        let files = self.storage.list(ARCHIVE_EXTENSION).await?;
        debug!(
            "Scanning {} archives in {} ({} workers)",
            files.len(),
            self.storage.root().display(),
            self.options.concurrency.max(1)
        );

        let mut resolver = LatestVersionResolver::new();
        let mut entries = Vec::with_capacity(files.len());

        let mut work = stream::iter(files)
            .map(|relative| self.compute(relative))
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some(result) = work.next().await {
            let entry = result?;
            resolver.observe(entries.len(), entry.package.identity());
            entries.push(entry);
        }

        let ids = resolver.id_count();
        for (index, flags) in resolver.finish() {
            let metadata = &mut entries[index].metadata;
            metadata.is_latest_version = flags.is_latest_version;
            metadata.is_absolute_latest_version = flags.is_absolute_latest_version;
        }

        info!(
            "Scanned {} packages ({} ids) in {:?}",
            entries.len(),
            ids,
            started.elapsed()
        );
        Ok(entries)
    }
}
