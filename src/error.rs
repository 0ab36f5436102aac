//! Error types for pkgfeed
//!
//! All modules use `FeedResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pkgfeed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// All errors that can occur in pkgfeed
#[derive(Error, Debug)]
pub enum FeedError {
    // Repository errors
    #[error("Package {id} {version} already exists at {}", path.display())]
    AlreadyExists {
        id: String,
        version: String,
        path: PathBuf,
    },

    #[error("Corrupt package archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("Expected package file is missing: {}", .0.display())]
    MissingExpectedFile(PathBuf),

    #[error("Invalid package version: {0}")]
    InvalidVersion(String),

    #[error("Invalid package id: {0}")]
    InvalidId(String),

    #[error("File system watch failed: {0}")]
    Watch(String),

    // Configuration errors
    #[error("Invalid configuration at {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {}: {source}", path.display())]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl FeedError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a corrupt archive error
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptArchive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether a later read may succeed without any change to storage
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Watch(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyExists { .. } => Some(
                "Bump the package version, or set repository.allow_override_existing_package_on_push = true",
            ),
            Self::CorruptArchive { .. } => {
                Some("Remove or replace the damaged archive; the cache rebuilds on the next read")
            }
            Self::ConfigInvalid { .. } => Some("Run: pkgfeed config init --force"),
            _ => None,
        }
    }
}
