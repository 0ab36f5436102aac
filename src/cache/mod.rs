//! Package metadata cache
//!
//! Maps every package loaded from storage to its [`DerivedMetadata`]
//! (size, hash, timestamps, paths, latest-version flags, frameworks).
//! The cache is built lazily on first read and rebuilt whole after any
//! repository write or observed storage change.
//!
//! # Cache States
//!
//! | State | Description |
//! |-------|-------------|
//! | Absent | Nothing built; next read scans storage |
//! | Populated | Snapshot published; reads share it |
//!
//! [`DerivedMetadata`]: crate::package::DerivedMetadata

pub mod latest;
pub mod package_cache;
pub mod scan;
pub mod snapshot;
pub mod watcher;

pub use latest::{LatestFlags, LatestVersionResolver};
pub use package_cache::{CacheGuard, PackageCache};
pub use scan::{MetadataComputer, ScanOptions};
pub use snapshot::{CachedPackage, Snapshot};
pub use watcher::{ChangeNotifier, ChangeWatcher};
