//! The package cache state machine
//!
//! | State | Meaning |
//! |-------|---------|
//! | Absent | No snapshot; the next read rebuilds |
//! | Populated | Snapshot built at a given change epoch |
//!
//! Both reads and writes go through one `tokio::sync::Mutex`. A rebuild runs
//! while that lock is held, so at most one rebuild is ever in flight and
//! concurrent readers wait for it instead of seeing a partial or stale view.
//! Writers hold the same lock across their storage mutation and the
//! invalidation that follows it.

use super::scan::MetadataComputer;
use super::snapshot::Snapshot;
use super::watcher::{ChangeNotifier, ChangeWatcher};
use crate::archive::ARCHIVE_EXTENSION;
use crate::error::FeedResult;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

enum CacheState {
    Absent,
    Populated { snapshot: Arc<Snapshot>, epoch: u64 },
}

struct CacheInner {
    state: CacheState,
    generation: u64,
}

/// Lifecycle of the storage watch
enum WatchRegistration {
    /// Not attempted yet; registers on the next rebuild
    Pending,
    Active(ChangeWatcher),
    /// Root missing or watch failed; retried after the next repository write
    Skipped,
    /// Monitoring turned off in configuration
    Disabled,
    Disposed,
}

/// Lazily built, lock-guarded map of loaded packages to derived metadata
pub struct PackageCache {
    inner: Mutex<CacheInner>,
    computer: MetadataComputer,
    changes: ChangeNotifier,
    watch: StdMutex<WatchRegistration>,
}

impl PackageCache {
    /// Create an empty cache. Nothing is scanned until the first read.
    pub fn new(computer: MetadataComputer, monitor_changes: bool) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                state: CacheState::Absent,
                generation: 0,
            }),
            computer,
            changes: ChangeNotifier::new(),
            watch: StdMutex::new(if monitor_changes {
                WatchRegistration::Pending
            } else {
                WatchRegistration::Disabled
            }),
        }
    }

    /// Enter the cache's critical section
    pub async fn lock(&self) -> CacheGuard<'_> {
        CacheGuard {
            cache: self,
            inner: self.inner.lock().await,
        }
    }

    /// Current snapshot, rebuilding first if there is none
    pub async fn get(&self) -> FeedResult<Arc<Snapshot>> {
        self.lock().await.snapshot().await
    }

    /// Drop the current snapshot. Idempotent.
    pub async fn invalidate(&self) {
        self.lock().await.invalidate();
    }

    /// Handle for reporting storage changes made outside the repository
    pub fn change_notifier(&self) -> ChangeNotifier {
        self.changes.clone()
    }

    /// Whether a storage watch is currently active
    pub fn is_watching(&self) -> bool {
        matches!(*self.watch_state(), WatchRegistration::Active(_))
    }

    /// Re-arm a skipped watch registration. Called after repository writes,
    /// which create the storage root if it was missing.
    pub fn resume_watching(&self) {
        let mut watch = self.watch_state();
        if matches!(*watch, WatchRegistration::Skipped) {
            *watch = WatchRegistration::Pending;
        }
    }

    /// Stop watching storage. Safe to call more than once.
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.watch_state(), WatchRegistration::Disposed);
        if let WatchRegistration::Active(watcher) = previous {
            debug!("Stopped watching {}", watcher.root().display());
        }
    }

    fn watch_state(&self) -> std::sync::MutexGuard<'_, WatchRegistration> {
        // The guarded value stays consistent even if a holder panicked
        self.watch.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn ensure_watching(&self) {
        if !matches!(*self.watch_state(), WatchRegistration::Pending) {
            return;
        }

        let storage = self.computer.storage();
        let outcome = if storage.root_exists().await {
            match ChangeWatcher::start(storage.root(), ARCHIVE_EXTENSION, self.changes.clone()) {
                Ok(watcher) => WatchRegistration::Active(watcher),
                Err(e) => {
                    warn!("Automatic cache invalidation unavailable: {}", e);
                    WatchRegistration::Skipped
                }
            }
        } else {
            debug!(
                "Storage root {} does not exist, not watching",
                storage.root().display()
            );
            WatchRegistration::Skipped
        };

        let mut watch = self.watch_state();
        // dispose() may have run while the watcher was starting
        if matches!(*watch, WatchRegistration::Pending) {
            *watch = outcome;
        }
    }
}

impl Drop for PackageCache {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Exclusive access to the cache state
pub struct CacheGuard<'a> {
    cache: &'a PackageCache,
    inner: MutexGuard<'a, CacheInner>,
}

impl CacheGuard<'_> {
    /// Current snapshot, rebuilding if absent or if storage changed since it
    /// was built. A failed rebuild leaves the cache absent.
    pub async fn snapshot(&mut self) -> FeedResult<Arc<Snapshot>> {
        let epoch = self.cache.changes.current();

        if let CacheState::Populated {
            snapshot,
            epoch: built_at,
        } = &self.inner.state
        {
            if *built_at == epoch {
                return Ok(Arc::clone(snapshot));
            }
            debug!("Storage changed since snapshot {}", snapshot.generation());
        }
        self.inner.state = CacheState::Absent;

        self.cache.ensure_watching().await;

        let entries = match self.cache.computer.scan().await {
            Ok(entries) => entries,
            Err(e) => {
                if e.is_retryable() {
                    warn!("Package scan failed, will retry on next read: {}", e);
                } else {
                    warn!("Package scan failed: {}", e);
                }
                return Err(e);
            }
        };

        self.inner.generation += 1;
        let snapshot = Arc::new(Snapshot::new(self.inner.generation, entries));
        self.inner.state = CacheState::Populated {
            snapshot: Arc::clone(&snapshot),
            epoch,
        };

        info!(
            "Published package snapshot {} ({} packages)",
            snapshot.generation(),
            snapshot.len()
        );
        Ok(snapshot)
    }

    /// Drop the current snapshot so the next read rebuilds
    pub fn invalidate(&mut self) {
        if let CacheState::Populated { snapshot, .. } = &self.inner.state {
            debug!("Invalidating package snapshot {}", snapshot.generation());
        }
        self.inner.state = CacheState::Absent;
    }

    /// Whether a snapshot is available without rebuilding
    pub fn is_populated(&self) -> bool {
        match &self.inner.state {
            CacheState::Populated { epoch, .. } => *epoch == self.cache.changes.current(),
            CacheState::Absent => false,
        }
    }
}
