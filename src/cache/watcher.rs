//! File system change watcher for automatic cache invalidation.
//!
//! Watches the storage root (non-recursively) for archives being created,
//! modified, removed, or renamed. Any such event invalidates the whole cache;
//! there is no per-entry invalidation, because a partially refreshed snapshot
//! would mix two scans.
//!
//! The watcher callback never takes the cache lock. It bumps a shared change
//! epoch, and the cache compares that epoch with the one its snapshot was
//! built at on the next read.

use crate::error::{FeedError, FeedResult};
use notify::event::{MetadataKind, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared counter of observed storage changes
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    epoch: Arc<AtomicU64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that storage changed
    pub fn notify_change(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Current change epoch
    pub fn current(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

/// Watches one storage root. Dropping it stops watching.
pub struct ChangeWatcher {
    /// The OS file watcher. Kept alive so the watch remains active.
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl ChangeWatcher {
    /// Start watching `root` for changes to files with `extension`.
    ///
    /// Uses `notify::RecommendedWatcher` (inotify on Linux, FSEvents on macOS).
    /// The root is canonicalized so OS-reported paths compare equal.
    pub fn start(root: &Path, extension: &str, notifier: ChangeNotifier) -> FeedResult<Self> {
        let root = canonicalize_or_keep(root);
        let watched_root = root.clone();
        let extension = extension.to_string();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if is_relevant(&event, &watched_root, &extension) {
                        debug!("Storage change detected: {:?} {:?}", event.kind, event.paths);
                        notifier.notify_change();
                    }
                }
                Err(e) => {
                    // Events may have been lost; assume something changed
                    warn!("File watch error: {}", e);
                    notifier.notify_change();
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| FeedError::Watch(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| FeedError::Watch(format!("{}: {}", root.display(), e)))?;

        debug!("Watching {}", root.display());
        Ok(Self {
            _watcher: watcher,
            root,
        })
    }

    /// The watched directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("root", &self.root)
            .finish()
    }
}

/// Whether an event concerns an archive directly under `root`
fn is_relevant(event: &Event, root: &Path, extension: &str) -> bool {
    let kind_matches = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => false,
    };

    kind_matches
        && event.paths.iter().any(|path| {
            let has_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            let in_root = path
                .parent()
                .is_some_and(|parent| parent == root || canonicalize_or_keep(parent) == root);
            has_extension && in_root
        })
}

/// Canonicalize a path, falling back to the original if canonicalization fails
/// (e.g. because the path doesn't exist yet).
fn canonicalize_or_keep(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
