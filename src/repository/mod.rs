//! Package repository facade
//!
//! Read operations answer from the current cache snapshot, building it first
//! if needed. Write operations hold the cache lock across the storage change
//! and the invalidation that follows, so a read never observes storage and
//! cache disagreeing about a write made through this facade.

pub mod search;

pub use search::{frameworks_compatible, SearchFilter, TermMatcher, TokenMatcher};

use crate::archive::{ArchiveReader, HashProvider, NupkgReader, Sha512Hasher, ARCHIVE_EXTENSION};
use crate::cache::{CacheGuard, MetadataComputer, PackageCache, ScanOptions};
use crate::config::RepositoryConfig;
use crate::error::{FeedError, FeedResult};
use crate::package::{DerivedMetadata, Package, PackageContent, PackageVersion, TargetFramework};
use crate::storage::{FlatPathResolver, LocalStorage, PathResolver, StorageBackend};
use chrono::Utc;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Behavior switches, taken from [`RepositoryConfig`]
#[derive(Debug, Clone, Copy)]
struct Policy {
    allow_override: bool,
    enable_delisting: bool,
    enable_framework_filtering: bool,
}

/// Assembles a [`PackageRepository`], defaulting every collaborator not set
pub struct RepositoryBuilder {
    config: RepositoryConfig,
    storage: Option<Arc<dyn StorageBackend>>,
    paths: Option<Arc<dyn PathResolver>>,
    reader: Option<Arc<dyn ArchiveReader>>,
    hasher: Option<Arc<dyn HashProvider>>,
    matcher: Option<Arc<dyn TermMatcher>>,
}

impl RepositoryBuilder {
    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn path_resolver(mut self, paths: Arc<dyn PathResolver>) -> Self {
        self.paths = Some(paths);
        self
    }

    pub fn archive_reader(mut self, reader: Arc<dyn ArchiveReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn hasher(mut self, hasher: Arc<dyn HashProvider>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn term_matcher(mut self, matcher: Arc<dyn TermMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn build(self) -> PackageRepository {
        let config = self.config;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(LocalStorage::new(config.root.clone())));
        let reader = self.reader.unwrap_or_else(|| Arc::new(NupkgReader));

        let options = ScanOptions {
            enable_delisting: config.enable_delisting,
            enable_framework_filtering: config.enable_framework_filtering,
            concurrency: config.effective_scan_concurrency(),
        };
        let computer = MetadataComputer::new(
            Arc::clone(&storage),
            Arc::clone(&reader),
            self.hasher.unwrap_or_else(|| Arc::new(Sha512Hasher)),
            options,
        );

        debug!(
            "Repository at {} (delisting: {}, framework filtering: {}, monitoring: {})",
            storage.root().display(),
            config.enable_delisting,
            config.enable_framework_filtering,
            config.enable_file_system_monitoring
        );

        PackageRepository {
            cache: PackageCache::new(computer, config.enable_file_system_monitoring),
            storage,
            paths: self.paths.unwrap_or_else(|| Arc::new(FlatPathResolver)),
            reader,
            matcher: self.matcher.unwrap_or_else(|| Arc::new(TokenMatcher)),
            policy: Policy {
                allow_override: config.allow_override_existing_package_on_push,
                enable_delisting: config.enable_delisting,
                enable_framework_filtering: config.enable_framework_filtering,
            },
        }
    }
}

/// Lookup, search, add and remove over a cached view of package storage
pub struct PackageRepository {
    cache: PackageCache,
    storage: Arc<dyn StorageBackend>,
    paths: Arc<dyn PathResolver>,
    reader: Arc<dyn ArchiveReader>,
    matcher: Arc<dyn TermMatcher>,
    policy: Policy,
}

impl PackageRepository {
    /// Start building a repository from settings
    pub fn builder(config: RepositoryConfig) -> RepositoryBuilder {
        RepositoryBuilder {
            config,
            storage: None,
            paths: None,
            reader: None,
            hasher: None,
            matcher: None,
        }
    }

    /// Local-directory repository with the default reader, hasher and layout
    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::builder(config.clone()).build()
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        self.storage.root()
    }

    /// The archive reader, for loading packages to push
    pub fn reader(&self) -> &dyn ArchiveReader {
        self.reader.as_ref()
    }

    /// Every package in the current snapshot, ordered by id then version
    pub async fn get_packages(&self) -> FeedResult<Vec<Arc<Package>>> {
        let snapshot = self.cache.get().await?;
        Ok(snapshot
            .sorted()
            .into_iter()
            .map(|entry| Arc::clone(&entry.package))
            .collect())
    }

    /// Every package paired with its derived metadata, ordered by id then version
    pub async fn get_packages_with_metadata(
        &self,
    ) -> FeedResult<Vec<(Arc<Package>, DerivedMetadata)>> {
        let snapshot = self.cache.get().await?;
        Ok(snapshot
            .sorted()
            .into_iter()
            .map(|entry| (Arc::clone(&entry.package), entry.metadata.clone()))
            .collect())
    }

    /// Exact match on id (case-insensitive) and version
    pub async fn find_package(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> FeedResult<Option<Arc<Package>>> {
        let snapshot = self.cache.get().await?;
        Ok(snapshot
            .find(id, version)
            .map(|entry| Arc::clone(&entry.package)))
    }

    /// All versions of an id, lowest first
    pub async fn find_packages_by_id(&self, id: &str) -> FeedResult<Vec<Arc<Package>>> {
        let snapshot = self.cache.get().await?;
        Ok(snapshot
            .find_by_id(id)
            .into_iter()
            .map(|entry| Arc::clone(&entry.package))
            .collect())
    }

    pub async fn exists(&self, id: &str, version: &PackageVersion) -> FeedResult<bool> {
        Ok(self.find_package(id, version).await?.is_some())
    }

    /// Metadata for this exact package instance. Instances from an earlier
    /// snapshot are not found, even if their file is unchanged.
    pub async fn get_metadata_package(
        &self,
        package: &Package,
    ) -> FeedResult<Option<(Arc<Package>, DerivedMetadata)>> {
        let snapshot = self.cache.get().await?;
        Ok(snapshot
            .get(package.handle())
            .map(|entry| (Arc::clone(&entry.package), entry.metadata.clone())))
    }

    /// Listed packages matching `term`, optionally including prereleases and
    /// restricted to packages compatible with `target_frameworks`
    pub async fn search(
        &self,
        term: &str,
        target_frameworks: &[TargetFramework],
        allow_prerelease: bool,
    ) -> FeedResult<Vec<Arc<Package>>> {
        let filter = SearchFilter::new(term)
            .with_frameworks(target_frameworks.iter().cloned())
            .allow_prerelease(allow_prerelease);
        self.search_with(&filter).await
    }

    pub async fn search_with(&self, filter: &SearchFilter) -> FeedResult<Vec<Arc<Package>>> {
        let snapshot = self.cache.get().await?;
        let results: Vec<_> = snapshot
            .sorted()
            .into_iter()
            .filter(|entry| {
                filter.accepts(
                    entry,
                    self.matcher.as_ref(),
                    self.policy.enable_framework_filtering,
                )
            })
            .map(|entry| Arc::clone(&entry.package))
            .collect();

        debug!("Search '{}' matched {} packages", filter.term, results.len());
        Ok(results)
    }

    /// Write a package into storage and invalidate the cache.
    ///
    /// Any stored archive with the same identity counts as occupying the
    /// package's place, whatever its file name. With overriding disabled an
    /// occupant fails the add with `AlreadyExists` and leaves storage and
    /// cache untouched. With overriding enabled the new archive replaces
    /// every occupant, so one identity never ends up in two files.
    pub async fn add_package(&self, package: &Package) -> FeedResult<()> {
        let mut guard = self.cache.lock().await;

        let resolved = self.paths.package_path(package.identity());
        let occupants = self.occupants(&mut guard, package, &resolved).await?;
        if !self.policy.allow_override {
            if let Some(existing) = occupants.first() {
                return Err(FeedError::AlreadyExists {
                    id: package.id().to_string(),
                    version: package.version().to_string(),
                    path: self.storage.full_path(existing),
                });
            }
        }

        // Overwrite a same-named occupant in place; on case-insensitive file
        // systems its spelling and the resolved one are the same file
        let destination = occupants
            .iter()
            .find(|path| same_file_name(path, &resolved))
            .cloned()
            .unwrap_or(resolved);

        match package.content() {
            PackageContent::Stored(source) if *source == destination => {
                debug!("{} is already stored at {}", package, destination.display());
            }
            PackageContent::Stored(source) => {
                let mut reader = self.storage.open_read(source).await?;
                self.storage.write(&destination, &mut reader).await?;
            }
            PackageContent::Memory(bytes) => {
                let mut reader = Cursor::new(Arc::clone(bytes));
                self.storage.write(&destination, &mut reader).await?;
            }
        }

        // Storage changed; whatever happens next the snapshot is stale
        guard.invalidate();

        for superseded in occupants
            .iter()
            .filter(|path| !same_file_name(path, &destination))
        {
            match self.storage.delete(superseded).await {
                Ok(()) => info!(
                    "Removed {} superseded by {}",
                    superseded.display(),
                    package
                ),
                Err(FeedError::MissingExpectedFile(path)) => {
                    debug!("{} already gone", path.display())
                }
                Err(e) => return Err(e),
            }
        }

        if self.policy.enable_delisting {
            self.storage
                .set_hidden(&destination, !package.is_listed())
                .await?;
        }
        drop(guard);
        self.cache.resume_watching();

        info!("Added {} at {}", package, destination.display());
        Ok(())
    }

    /// Stored files holding `package`'s identity, plus the resolved path if
    /// something else already sits there. Falls back to matching file names
    /// when storage cannot be scanned.
    async fn occupants(
        &self,
        guard: &mut CacheGuard<'_>,
        package: &Package,
        resolved: &Path,
    ) -> FeedResult<Vec<PathBuf>> {
        let mut found: Vec<PathBuf> = match guard.snapshot().await {
            Ok(snapshot) => snapshot
                .iter()
                .filter(|entry| entry.package.identity() == package.identity())
                .map(|entry| entry.metadata.relative_path.clone())
                .collect(),
            Err(e) => {
                warn!("Checking {} against file names only: {}", package, e);
                self.storage
                    .list(ARCHIVE_EXTENSION)
                    .await?
                    .into_iter()
                    .filter(|path| same_file_name(path, resolved))
                    .collect()
            }
        };

        let named = found.iter().any(|path| same_file_name(path, resolved));
        if !named && self.storage.exists(resolved).await? {
            found.push(resolved.to_path_buf());
        }
        found.sort();
        Ok(found)
    }

    /// Remove a package: hide it when delisting is enabled, delete it otherwise
    pub async fn remove_package(&self, package: &Package) -> FeedResult<()> {
        let mut guard = self.cache.lock().await;
        self.remove_locked(&mut guard, package).await?;
        drop(guard);
        self.cache.resume_watching();
        Ok(())
    }

    /// Remove the package with this id and version. Returns `false` when there
    /// was nothing to remove.
    pub async fn remove_package_by_id(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> FeedResult<bool> {
        let mut guard = self.cache.lock().await;
        let snapshot = guard.snapshot().await?;

        let Some(entry) = snapshot.find(id, version) else {
            debug!("Nothing to remove for {} {}", id, version);
            return Ok(false);
        };

        self.remove_locked(&mut guard, &entry.package).await?;
        drop(guard);
        self.cache.resume_watching();
        Ok(true)
    }

    async fn remove_locked(&self, guard: &mut CacheGuard<'_>, package: &Package) -> FeedResult<()> {
        let relative = self.stored_path(package);

        if self.policy.enable_delisting {
            if !self.storage.exists(&relative).await? {
                warn_missing(package, &self.storage.full_path(&relative));
                guard.invalidate();
                return Ok(());
            }
            self.storage.set_hidden(&relative, true).await?;
            guard.invalidate();
            // Touch the archive so other watchers of this root notice the change
            self.storage.set_last_modified(&relative, Utc::now()).await?;
            info!("Delisted {}", package);
            return Ok(());
        }

        match self.storage.delete(&relative).await {
            Ok(()) => info!("Deleted {} at {}", package, relative.display()),
            Err(FeedError::MissingExpectedFile(path)) => warn_missing(package, &path),
            Err(e) => return Err(e),
        }
        guard.invalidate();
        Ok(())
    }

    fn stored_path(&self, package: &Package) -> PathBuf {
        match package.content() {
            PackageContent::Stored(relative) => relative.clone(),
            PackageContent::Memory(_) => self.paths.package_path(package.identity()),
        }
    }

    /// Drop the cached snapshot; the next read rescans storage
    pub async fn clear_cache(&self) {
        self.cache.invalidate().await;
    }

    /// Whether storage changes outside this repository are being watched
    pub fn is_monitoring(&self) -> bool {
        self.cache.is_watching()
    }

    /// Stop watching storage. Safe to call more than once.
    pub fn dispose(&self) {
        self.cache.dispose();
    }
}

/// Storage and cache disagree about a package; the removal still counts
fn warn_missing(package: &Package, path: &Path) {
    warn!(
        "Package {} is cached but {} is missing; treating as removed",
        package,
        path.display()
    );
}

/// File names equal ignoring ASCII case, as package paths are compared
fn same_file_name(a: &Path, b: &Path) -> bool {
    a.as_os_str().eq_ignore_ascii_case(b.as_os_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackageIdentity, PackageManifest};
    use crate::testing::NupkgBuilder;
    use std::collections::{BTreeSet, HashMap};
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> RepositoryConfig {
        let mut config = RepositoryConfig::with_root(temp.path().join("packages"));
        config.enable_file_system_monitoring = false;
        config
    }

    fn upload(builder: NupkgBuilder) -> Package {
        Package::from_bytes(&NupkgReader, Path::new("upload.nupkg"), builder.build()).unwrap()
    }

    fn v(s: &str) -> PackageVersion {
        PackageVersion::parse(s).unwrap()
    }

    fn archive_names(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".nupkg"))
            .collect();
        names.sort();
        names
    }

    /// At most one absolute latest per id, on its highest version; exactly
    /// one latest per id with a release, on its highest release
    fn assert_latest_flags(entries: &[(Arc<Package>, DerivedMetadata)]) {
        let mut by_id: HashMap<&str, Vec<&(Arc<Package>, DerivedMetadata)>> = HashMap::new();
        for entry in entries {
            by_id.entry(entry.0.id().key()).or_default().push(entry);
        }

        for group in by_id.values() {
            let newest = group.iter().map(|(p, _)| p.version()).max();
            let newest_release = group
                .iter()
                .map(|(p, _)| p.version())
                .filter(|version| version.is_release())
                .max();
            for (package, metadata) in group {
                assert_eq!(
                    metadata.is_absolute_latest_version,
                    Some(package.version()) == newest,
                    "absolute latest flag of {}",
                    package
                );
                assert_eq!(
                    metadata.is_latest_version,
                    Some(package.version()) == newest_release,
                    "latest flag of {}",
                    package
                );
            }
        }
    }

    async fn flags(repo: &PackageRepository, id: &str, version: &str) -> (bool, bool) {
        let pkg = repo.find_package(id, &v(version)).await.unwrap().unwrap();
        let (_, metadata) = repo.get_metadata_package(&pkg).await.unwrap().unwrap();
        (metadata.is_latest_version, metadata.is_absolute_latest_version)
    }

    #[tokio::test]
    async fn empty_storage_has_no_packages() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        assert!(repo.get_packages().await.unwrap().is_empty());
        assert!(repo.search("", &[], true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn highest_release_is_latest() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();
        repo.add_package(&upload(NupkgBuilder::new("Foo", "2.0.0"))).await.unwrap();

        assert_eq!(flags(&repo, "Foo", "2.0.0").await, (true, true));
        assert_eq!(flags(&repo, "foo", "1.0.0").await, (false, false));
    }

    #[tokio::test]
    async fn prerelease_is_only_absolute_latest() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();
        repo.add_package(&upload(NupkgBuilder::new("Foo", "2.0.0-beta"))).await.unwrap();

        assert_eq!(flags(&repo, "Foo", "2.0.0-beta").await, (false, true));
        assert_eq!(flags(&repo, "Foo", "1.0.0").await, (true, false));
    }

    #[tokio::test]
    async fn add_without_override_rejects_existing() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.allow_override_existing_package_on_push = false;
        let repo = PackageRepository::from_config(&config);

        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();
        let before = repo.get_packages().await.unwrap();
        let stored = temp.path().join("packages").join("foo.1.0.0.nupkg");
        let original = std::fs::read(&stored).unwrap();

        let replacement = upload(NupkgBuilder::new("FOO", "1.0.0").description("different"));
        let err = repo.add_package(&replacement).await.unwrap_err();
        assert!(matches!(err, FeedError::AlreadyExists { .. }));

        assert_eq!(std::fs::read(&stored).unwrap(), original);
        // Same snapshot instances: the cache was not invalidated
        let after = repo.get_packages().await.unwrap();
        assert!(Arc::ptr_eq(&before[0], &after[0]));
    }

    #[tokio::test]
    async fn add_with_override_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));

        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0").description("second")))
            .await
            .unwrap();

        let packages = repo.get_packages().await.unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].manifest().description.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn add_without_override_sees_archives_under_other_names() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.allow_override_existing_package_on_push = false;
        let root = temp.path().join("packages");
        NupkgBuilder::new("Foo", "1.0.0").write_to(&root);
        NupkgBuilder::new("Bar", "2.0.0").write_as(&root, "dropped-by-hand.nupkg");
        let repo = PackageRepository::from_config(&config);

        for builder in [NupkgBuilder::new("foo", "1.0.0"), NupkgBuilder::new("BAR", "2.0")] {
            let err = repo.add_package(&upload(builder)).await.unwrap_err();
            assert!(matches!(err, FeedError::AlreadyExists { .. }));
        }

        assert_eq!(
            archive_names(&root),
            vec!["Foo.1.0.0.nupkg", "dropped-by-hand.nupkg"]
        );
        assert_eq!(repo.find_packages_by_id("foo").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn override_replaces_archives_under_other_names() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("packages");
        NupkgBuilder::new("Foo", "1.0.0")
            .description("hand placed")
            .write_to(&root);
        NupkgBuilder::new("Bar", "2.0.0").write_as(&root, "dropped-by-hand.nupkg");
        let repo = PackageRepository::from_config(&config(&temp));

        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0").description("pushed")))
            .await
            .unwrap();
        repo.add_package(&upload(NupkgBuilder::new("Bar", "2.0.0")))
            .await
            .unwrap();

        let names = archive_names(&root);
        assert_eq!(names.len(), 2);
        assert!(!names.contains(&"dropped-by-hand.nupkg".to_string()));

        let foo = repo.find_packages_by_id("foo").await.unwrap();
        assert_eq!(foo.len(), 1);
        assert_eq!(foo[0].manifest().description.as_deref(), Some("pushed"));
        assert_eq!(flags(&repo, "Foo", "1.0.0").await, (true, true));
        assert_eq!(repo.find_packages_by_id("bar").await.unwrap().len(), 1);

        assert!(repo.remove_package_by_id("Foo", &v("1.0.0")).await.unwrap());
        assert!(!repo.exists("Foo", &v("1.0.0")).await.unwrap());
    }

    #[tokio::test]
    async fn re_adding_a_stored_package_keeps_its_file() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();
        let stored_file = temp.path().join("packages/foo.1.0.0.nupkg");
        let original = std::fs::read(&stored_file).unwrap();

        let stored = repo.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        repo.add_package(&stored).await.unwrap();

        assert_eq!(std::fs::read(&stored_file).unwrap(), original);
        assert_eq!(repo.get_packages().await.unwrap().len(), 1);
        // Still a write: the cache was rebuilt
        assert!(repo.get_metadata_package(&stored).await.unwrap().is_none());

        let mut strict = config(&temp);
        strict.allow_override_existing_package_on_push = false;
        let strict = PackageRepository::from_config(&strict);
        let stored = strict.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        let err = strict.add_package(&stored).await.unwrap_err();
        assert!(matches!(err, FeedError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn add_falls_back_to_file_names_when_storage_is_unreadable() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.allow_override_existing_package_on_push = false;
        let root = temp.path().join("packages");
        NupkgBuilder::new("Foo", "1.0.0").write_to(&root);
        std::fs::write(root.join("broken.nupkg"), b"not a zip").unwrap();
        let repo = PackageRepository::from_config(&config);

        let err = repo
            .add_package(&upload(NupkgBuilder::new("FOO", "1.0.0")))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::AlreadyExists { .. }));

        repo.add_package(&upload(NupkgBuilder::new("Bar", "1.0.0")))
            .await
            .unwrap();
        assert!(root.join("bar.1.0.0.nupkg").exists());
    }

    #[tokio::test]
    async fn added_package_round_trips_size_and_hash() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        let bytes = NupkgBuilder::new("Foo", "1.2.3").build();
        let pkg = Package::from_bytes(&NupkgReader, Path::new("Foo.nupkg"), bytes.clone()).unwrap();

        repo.add_package(&pkg).await.unwrap();

        let found = repo.find_package("FOO", &v("1.2.3")).await.unwrap().unwrap();
        let (_, metadata) = repo.get_metadata_package(&found).await.unwrap().unwrap();
        assert_eq!(metadata.size_bytes, bytes.len() as u64);
        assert_eq!(
            metadata.content_hash_base64,
            Sha512Hasher.digest_base64(&mut Cursor::new(&bytes)).unwrap()
        );
        assert!(repo.exists("foo", &v("1.2.3")).await.unwrap());
        assert!(!repo.exists("foo", &v("1.2.4")).await.unwrap());
    }

    #[tokio::test]
    async fn writes_invalidate_and_old_instances_go_stale() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();

        let old = repo.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        assert!(repo.get_metadata_package(&old).await.unwrap().is_some());

        repo.add_package(&upload(NupkgBuilder::new("Bar", "1.0.0"))).await.unwrap();

        assert!(repo.get_metadata_package(&old).await.unwrap().is_none());
        let fresh = repo.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        assert_ne!(old.handle(), fresh.handle());
    }

    #[tokio::test]
    async fn repeated_clear_cache_rebuilds_same_view() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();
        repo.add_package(&upload(NupkgBuilder::new("Foo", "2.0.0-rc"))).await.unwrap();

        let view = |entries: Vec<(Arc<Package>, DerivedMetadata)>| {
            entries
                .into_iter()
                .map(|(p, m)| {
                    (
                        p.identity().to_string(),
                        m.is_latest_version,
                        m.is_absolute_latest_version,
                    )
                })
                .collect::<Vec<_>>()
        };

        let first = view(repo.get_packages_with_metadata().await.unwrap());
        repo.clear_cache().await;
        repo.clear_cache().await;
        let second = view(repo.get_packages_with_metadata().await.unwrap());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn delisting_hides_instead_of_deleting() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.enable_delisting = true;
        let repo = PackageRepository::from_config(&config);
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();

        let pkg = repo.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        repo.remove_package(&pkg).await.unwrap();

        assert!(temp.path().join("packages/foo.1.0.0.nupkg").exists());
        let reloaded = repo.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        assert!(!reloaded.is_listed());
        assert!(repo.search("foo", &[], true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unlisted_upload_is_hidden_when_delisting() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.enable_delisting = true;
        let repo = PackageRepository::from_config(&config);

        let bytes: Arc<[u8]> = NupkgBuilder::new("Foo", "1.0.0").build().into();
        let mut manifest = PackageManifest::new(PackageIdentity::parse("Foo", "1.0.0").unwrap());
        manifest.listed = false;
        let pkg = Package::uploaded(manifest, bytes);
        repo.add_package(&pkg).await.unwrap();

        let stored = repo.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        assert!(!stored.is_listed());
    }

    #[tokio::test]
    async fn hard_delete_removes_file() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();

        assert!(repo.remove_package_by_id("FOO", &v("1.0")).await.unwrap());
        assert!(!temp.path().join("packages/foo.1.0.0.nupkg").exists());
        assert!(repo.get_packages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_missing_package_reports_false() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        assert!(!repo.remove_package_by_id("Foo", &v("1.0.0")).await.unwrap());
    }

    #[tokio::test]
    async fn hard_delete_of_vanished_file_is_soft() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();

        let pkg = repo.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        std::fs::remove_file(temp.path().join("packages/foo.1.0.0.nupkg")).unwrap();

        repo.remove_package(&pkg).await.unwrap();
        assert!(repo.get_packages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delisting_vanished_file_leaves_no_marker() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.enable_delisting = true;
        let repo = PackageRepository::from_config(&config);
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0"))).await.unwrap();

        let pkg = repo.find_package("Foo", &v("1.0.0")).await.unwrap().unwrap();
        std::fs::remove_file(temp.path().join("packages/foo.1.0.0.nupkg")).unwrap();

        repo.remove_package(&pkg).await.unwrap();
        assert!(!temp.path().join("packages/foo.1.0.0.nupkg.hidden").exists());
        assert!(repo.get_packages().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reads_and_writes_exclude_each_other() {
        const VERSIONS: [&str; 8] = [
            "1.0.0",
            "1.1.0",
            "2.0.0-beta",
            "1.2.0",
            "3.0.0-rc.1",
            "2.0.0",
            "2.1.0",
            "4.0.0-alpha",
        ];
        let temp = TempDir::new().unwrap();
        let repo = Arc::new(PackageRepository::from_config(&config(&temp)));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "0.9.0"))).await.unwrap();

        let mut writers = Vec::new();
        for version in VERSIONS {
            let repo = Arc::clone(&repo);
            let package = upload(NupkgBuilder::new("Foo", version));
            writers.push(tokio::spawn(async move {
                repo.add_package(&package).await.unwrap();
                // A read started after the write returned sees it
                assert!(repo.exists("Foo", &v(version)).await.unwrap());
            }));
        }
        {
            let repo = Arc::clone(&repo);
            writers.push(tokio::spawn(async move {
                assert!(repo.remove_package_by_id("Foo", &v("0.9.0")).await.unwrap());
                assert!(!repo.exists("Foo", &v("0.9.0")).await.unwrap());
            }));
        }

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    let mut seen: BTreeSet<String> = BTreeSet::new();
                    for _ in 0..25 {
                        let entries = repo.get_packages_with_metadata().await.unwrap();
                        assert_latest_flags(&entries);

                        let added: BTreeSet<String> = entries
                            .iter()
                            .map(|(p, _)| p.version().to_string())
                            .filter(|version| version != "0.9.0")
                            .collect();
                        assert!(added.is_superset(&seen), "a later read lost a write");
                        seen = added;
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for task in writers.into_iter().chain(readers) {
            task.await.unwrap();
        }

        let all = repo.get_packages_with_metadata().await.unwrap();
        assert_eq!(all.len(), VERSIONS.len());
        assert_latest_flags(&all);
        assert_eq!(flags(&repo, "Foo", "2.1.0").await, (true, false));
        assert_eq!(flags(&repo, "Foo", "4.0.0-alpha").await, (false, true));
    }

    #[tokio::test]
    async fn search_filters_prerelease_and_frameworks() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.enable_framework_filtering = true;
        let repo = PackageRepository::from_config(&config);

        repo.add_package(&upload(NupkgBuilder::new("Alpha.Core", "1.0.0").lib("net45")))
            .await
            .unwrap();
        repo.add_package(&upload(NupkgBuilder::new("Alpha.Next", "2.0.0-beta").lib("net6.0")))
            .await
            .unwrap();
        repo.add_package(&upload(NupkgBuilder::new("Beta.Tools", "1.0.0").description("alpha helpers")))
            .await
            .unwrap();

        let ids = |found: Vec<Arc<Package>>| {
            found.iter().map(|p| p.id().to_string()).collect::<Vec<_>>()
        };

        assert_eq!(
            ids(repo.search("alpha", &[], false).await.unwrap()),
            vec!["Alpha.Core", "Beta.Tools"]
        );
        assert_eq!(
            ids(repo.search("alpha", &[], true).await.unwrap()),
            vec!["Alpha.Core", "Alpha.Next", "Beta.Tools"]
        );

        let net6 = TargetFramework::parse("net6.0").unwrap();
        assert_eq!(
            ids(repo.search("alpha", &[net6], true).await.unwrap()),
            vec!["Alpha.Next", "Beta.Tools"]
        );
    }

    #[tokio::test]
    async fn framework_filter_ignored_when_disabled() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        repo.add_package(&upload(NupkgBuilder::new("Foo", "1.0.0").lib("net45")))
            .await
            .unwrap();

        let net6 = TargetFramework::parse("net6.0").unwrap();
        assert_eq!(repo.search("", &[net6], false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_by_id_orders_versions() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        for version in ["2.0.0", "1.0.0", "1.5.0-rc"] {
            repo.add_package(&upload(NupkgBuilder::new("Foo", version)))
                .await
                .unwrap();
        }

        let versions: Vec<String> = repo
            .find_packages_by_id("FOO")
            .await
            .unwrap()
            .iter()
            .map(|p| p.version().to_string())
            .collect();
        assert_eq!(versions, vec!["1.0.0", "1.5.0-rc", "2.0.0"]);
    }

    #[tokio::test]
    async fn corrupt_archive_fails_reads_until_removed() {
        let temp = TempDir::new().unwrap();
        let repo = PackageRepository::from_config(&config(&temp));
        let root = temp.path().join("packages");
        NupkgBuilder::new("Foo", "1.0.0").write_to(&root);
        std::fs::write(root.join("broken.nupkg"), b"not a zip").unwrap();

        let err = repo.get_packages().await.unwrap_err();
        assert!(matches!(err, FeedError::CorruptArchive { .. }));

        std::fs::remove_file(root.join("broken.nupkg")).unwrap();
        assert_eq!(repo.get_packages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn external_changes_picked_up_when_monitoring() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.enable_file_system_monitoring = true;
        let root = temp.path().join("packages");
        std::fs::create_dir_all(&root).unwrap();
        let repo = PackageRepository::from_config(&config);

        assert!(repo.get_packages().await.unwrap().is_empty());
        assert!(repo.is_monitoring());

        NupkgBuilder::new("Foo", "1.0.0").write_to(&root);
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        assert_eq!(repo.get_packages().await.unwrap().len(), 1);

        repo.dispose();
        repo.dispose();
        assert!(!repo.is_monitoring());
    }
}
