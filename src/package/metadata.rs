//! Metadata computed from an archive's storage entry rather than its contents

use super::TargetFramework;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Per-archive data derived during a cache rebuild
///
/// Built by the scan, finalized by latest-version resolution, then frozen
/// inside a published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetadata {
    pub size_bytes: u64,
    pub content_hash_base64: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub relative_path: PathBuf,
    pub full_path: PathBuf,
    pub is_latest_version: bool,
    pub is_absolute_latest_version: bool,
    pub supported_frameworks: Option<BTreeSet<TargetFramework>>,
}

impl DerivedMetadata {
    /// Human-readable size (e.g., "1.5 MB")
    pub fn display_size(&self) -> String {
        format_bytes(self.size_bytes)
    }
}

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
