//! Local directory storage
//!
//! The hidden attribute is kept as a zero-byte `<file>.hidden` marker beside
//! the archive so it works the same on every platform. Markers never match
//! the archive extension, so listings and the change watcher ignore them.

use super::{ByteStream, FileTimes, StorageBackend};
use crate::error::{FeedError, FeedResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::debug;

const HIDDEN_MARKER_SUFFIX: &str = ".hidden";
const PARTIAL_SUFFIX: &str = ".partial";

/// Storage backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create storage rooted at `root`, resolved against the working
    /// directory when relative. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        // Only fails for an empty path or an unreadable working directory
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn marker_path(&self, relative: &Path) -> PathBuf {
        Self::with_suffix(&self.full_path(relative), HIDDEN_MARKER_SUFFIX)
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn root_exists(&self) -> bool {
        fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn list(&self, extension: &str) -> FeedResult<Vec<PathBuf>> {
        if !self.root_exists().await {
            debug!("Storage root {} does not exist", self.root.display());
            return Ok(vec![]);
        }

        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            FeedError::io(format!("reading directory {}", self.root.display()), e)
        })?;

        let mut files = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FeedError::io("reading directory entry", e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            let path = PathBuf::from(entry.file_name());
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));

            if is_file && matches {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    async fn open_read(&self, relative: &Path) -> FeedResult<ByteStream> {
        let full = self.full_path(relative);
        let file = fs::File::open(&full)
            .await
            .map_err(|e| FeedError::io(format!("opening {}", full.display()), e))?;
        Ok(Box::new(file))
    }

    async fn write(
        &self,
        relative: &Path,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> FeedResult<u64> {
        let full = self.full_path(relative);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FeedError::io(format!("creating directory {}", parent.display()), e))?;
        }

        // Write beside the target, then rename into place
        let partial = Self::with_suffix(&full, PARTIAL_SUFFIX);
        let result = async {
            let mut file = fs::File::create(&partial).await?;
            let written = tokio::io::copy(content, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&partial, &full).await?;
            Ok::<u64, std::io::Error>(written)
        }
        .await;

        match result {
            Ok(written) => {
                debug!("Wrote {} bytes to {}", written, full.display());
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                Err(FeedError::io(format!("writing {}", full.display()), e))
            }
        }
    }

    async fn delete(&self, relative: &Path) -> FeedResult<()> {
        let full = self.full_path(relative);
        match fs::remove_file(&full).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FeedError::MissingExpectedFile(full));
            }
            Err(e) => return Err(FeedError::io(format!("deleting {}", full.display()), e)),
        }

        let marker = self.marker_path(relative);
        match fs::remove_file(&marker).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FeedError::io(format!("deleting {}", marker.display()), e)),
        }
    }

    async fn exists(&self, relative: &Path) -> FeedResult<bool> {
        let full = self.full_path(relative);
        fs::try_exists(&full)
            .await
            .map_err(|e| FeedError::io(format!("checking {}", full.display()), e))
    }

    async fn times(&self, relative: &Path) -> FeedResult<FileTimes> {
        let full = self.full_path(relative);
        let metadata = fs::metadata(&full)
            .await
            .map_err(|e| FeedError::io(format!("reading metadata of {}", full.display()), e))?;

        let modified = metadata
            .modified()
            .map_err(|e| FeedError::io(format!("reading mtime of {}", full.display()), e))?;
        // Not every file system records a birth time
        let created = metadata.created().unwrap_or(modified);

        Ok(FileTimes {
            created: DateTime::<Utc>::from(created),
            modified: DateTime::<Utc>::from(modified),
        })
    }

    async fn set_last_modified(&self, relative: &Path, at: DateTime<Utc>) -> FeedResult<()> {
        let full = self.full_path(relative);
        let target = full.clone();
        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::options().write(true).open(&target)?;
            file.set_modified(SystemTime::from(at))
        })
        .await
        .map_err(|e| FeedError::Internal(format!("timestamp task failed: {}", e)))?
        .map_err(|e| FeedError::io(format!("setting mtime of {}", full.display()), e))
    }

    async fn is_hidden(&self, relative: &Path) -> FeedResult<bool> {
        let marker = self.marker_path(relative);
        fs::try_exists(&marker)
            .await
            .map_err(|e| FeedError::io(format!("checking {}", marker.display()), e))
    }

    async fn set_hidden(&self, relative: &Path, hidden: bool) -> FeedResult<()> {
        let marker = self.marker_path(relative);
        if hidden {
            fs::write(&marker, b"")
                .await
                .map_err(|e| FeedError::io(format!("writing {}", marker.display()), e))
        } else {
            match fs::remove_file(&marker).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(FeedError::io(format!("deleting {}", marker.display()), e)),
            }
        }
    }
}
