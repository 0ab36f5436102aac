//! Durable storage for package archives
//!
//! The cache treats storage as the source of truth: every rebuild lists and
//! reads archives through [`StorageBackend`], and every write goes through it
//! before the cache is invalidated. All paths handed to a backend are relative
//! to its root.

pub mod local;
pub mod paths;

pub use local::LocalStorage;
pub use paths::{FlatPathResolver, PathResolver};

use crate::error::FeedResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

/// Boxed byte stream returned by [`StorageBackend::open_read`]
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Creation and modification times of a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// A durable byte store rooted at one location
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Root location of the store
    fn root(&self) -> &Path;

    /// Absolute path for a relative one
    fn full_path(&self, relative: &Path) -> PathBuf {
        self.root().join(relative)
    }

    /// Whether the root location currently exists
    async fn root_exists(&self) -> bool;

    /// Files directly under the root with the given extension (no recursion)
    async fn list(&self, extension: &str) -> FeedResult<Vec<PathBuf>>;

    /// Open a file for reading
    async fn open_read(&self, relative: &Path) -> FeedResult<ByteStream>;

    /// Replace the file at `relative` with the bytes from `content`.
    /// Returns the number of bytes written.
    async fn write(
        &self,
        relative: &Path,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> FeedResult<u64>;

    /// Delete a file. Fails with `MissingExpectedFile` if it does not exist.
    async fn delete(&self, relative: &Path) -> FeedResult<()>;

    /// Whether a file exists
    async fn exists(&self, relative: &Path) -> FeedResult<bool>;

    /// Creation and last-modified timestamps
    async fn times(&self, relative: &Path) -> FeedResult<FileTimes>;

    /// Set the last-modified timestamp
    async fn set_last_modified(&self, relative: &Path, at: DateTime<Utc>) -> FeedResult<()>;

    /// Whether the file carries the hidden attribute
    async fn is_hidden(&self, relative: &Path) -> FeedResult<bool>;

    /// Set or clear the hidden attribute
    async fn set_hidden(&self, relative: &Path, hidden: bool) -> FeedResult<()>;
}
