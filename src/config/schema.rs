//! Configuration schema for pkgfeed
//!
//! Configuration is stored at `~/.config/pkgfeed/config.toml`

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Package repository settings
    pub repository: RepositoryConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Package repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Directory holding the package archives
    pub root: PathBuf,

    /// Replace an existing archive when the same id and version is pushed again
    #[serde(deserialize_with = "lenient_true")]
    pub allow_override_existing_package_on_push: bool,

    /// Hide packages on delete instead of removing the archive
    #[serde(deserialize_with = "lenient_false")]
    pub enable_delisting: bool,

    /// Record supported frameworks and honor framework filters in search
    #[serde(deserialize_with = "lenient_false")]
    pub enable_framework_filtering: bool,

    /// Invalidate the cache when archives change outside pkgfeed
    #[serde(deserialize_with = "lenient_true")]
    pub enable_file_system_monitoring: bool,

    /// Number of archives inspected concurrently during a rebuild
    pub scan_concurrency: usize,
}

impl RepositoryConfig {
    /// Default concurrency for the rebuild scan
    pub const DEFAULT_SCAN_CONCURRENCY: usize = 4;

    /// Settings for a repository rooted at `root`, everything else default
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Get the scan concurrency, never below one
    pub fn effective_scan_concurrency(&self) -> usize {
        self.scan_concurrency.max(1)
    }

    /// Default archive directory
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pkgfeed")
            .join("packages")
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            allow_override_existing_package_on_push: true,
            enable_delisting: false,
            enable_framework_filtering: false,
            enable_file_system_monitoring: true,
            scan_concurrency: Self::DEFAULT_SCAN_CONCURRENCY,
        }
    }
}

/// Interpret a boolean setting, accepting common string spellings
pub fn parse_bool_setting(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn lenient_bool<'de, D>(deserializer: D, default: bool) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = toml::Value::deserialize(deserializer)?;
    let parsed = match &value {
        toml::Value::Boolean(b) => Some(*b),
        toml::Value::String(s) => parse_bool_setting(s),
        toml::Value::Integer(0) => Some(false),
        toml::Value::Integer(1) => Some(true),
        _ => None,
    };

    Ok(parsed.unwrap_or_else(|| {
        warn!(
            "Unrecognized boolean setting {}, using default {}",
            value, default
        );
        default
    }))
}

fn lenient_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_bool(deserializer, true)
}

fn lenient_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_bool(deserializer, false)
}
