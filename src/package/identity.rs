//! Package identity: case-insensitive ids and totally ordered versions
//!
//! Versions follow semantic-version precedence with an optional fourth
//! `revision` component. Build metadata is carried for display only.

use crate::error::{FeedError, FeedResult};
use semver::{BuildMetadata, Prerelease};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A package id. Compared case-insensitively, displayed as given.
#[derive(Debug, Clone)]
pub struct PackageId {
    original: String,
    key: String,
}

impl PackageId {
    /// Parse and validate a package id
    pub fn new(id: impl Into<String>) -> FeedResult<Self> {
        let original = id.into();
        let trimmed = original.trim();

        if trimmed.is_empty() {
            return Err(FeedError::InvalidId("package id cannot be empty".to_string()));
        }
        if trimmed.contains("..") || trimmed.starts_with('.') {
            return Err(FeedError::InvalidId(format!(
                "'{}': must not start with '.' or contain '..'",
                trimmed
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(FeedError::InvalidId(format!(
                "'{}': must contain only alphanumeric characters, '.', '-', or '_'",
                trimmed
            )));
        }

        Ok(Self {
            key: trimmed.to_ascii_lowercase(),
            original: trimmed.to_string(),
        })
    }

    /// The id as originally spelled
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Lowercased comparison key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Case-insensitive comparison against a raw string
    pub fn matches(&self, other: &str) -> bool {
        self.key.eq_ignore_ascii_case(other.trim())
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for PackageId {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for PackageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for PackageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// A package version: `major.minor[.patch[.revision]][-pre][+build]`
#[derive(Debug, Clone)]
pub struct PackageVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    pre: Prerelease,
    build: BuildMetadata,
}

impl PackageVersion {
    /// Parse a version string
    pub fn parse(input: &str) -> FeedResult<Self> {
        let invalid = |reason: &str| FeedError::InvalidVersion(format!("'{}': {}", input, reason));
        let text = input.trim();

        let (rest, build) = match text.split_once('+') {
            Some((rest, build)) => (
                rest,
                BuildMetadata::new(build).map_err(|e| invalid(&e.to_string()))?,
            ),
            None => (text, BuildMetadata::EMPTY),
        };
        let (numbers, pre) = match rest.split_once('-') {
            Some((_, "")) => return Err(invalid("empty prerelease label")),
            Some((numbers, pre)) => (
                numbers,
                Prerelease::new(pre).map_err(|e| invalid(&e.to_string()))?,
            ),
            None => (rest, Prerelease::EMPTY),
        };

        let parts = numbers
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid("version components must be numeric"));
                }
                part.parse::<u64>()
                    .map_err(|_| invalid("version component out of range"))
            })
            .collect::<FeedResult<Vec<u64>>>()?;

        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid("expected between one and four numeric components"));
        }
        let at = |i: usize| parts.get(i).copied().unwrap_or(0);

        Ok(Self {
            major: at(0),
            minor: at(1),
            patch: at(2),
            revision: at(3),
            pre,
            build,
        })
    }

    /// Whether this is a release (no prerelease label)
    pub fn is_release(&self) -> bool {
        self.pre.is_empty()
    }

    /// Whether this version carries a prerelease label
    pub fn is_prerelease(&self) -> bool {
        !self.is_release()
    }

    /// Normalized form without build metadata
    pub fn normalized(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if self.revision != 0 {
            out.push_str(&format!(".{}", self.revision));
        }
        if !self.pre.is_empty() {
            out.push('-');
            out.push_str(self.pre.as_str());
        }
        out
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch, self.revision).hash(state);
        self.pre.hash(state);
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision)
            .cmp(&(other.major, other.minor, other.patch, other.revision))
            // An empty prerelease sorts above any non-empty one
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())?;
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl FromStr for PackageVersion {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// `(id, version)` pair identifying one package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub id: PackageId,
    pub version: PackageVersion,
}

impl PackageIdentity {
    /// Create an identity from already parsed parts
    pub fn new(id: PackageId, version: PackageVersion) -> Self {
        Self { id, version }
    }

    /// Parse an identity from raw strings
    pub fn parse(id: &str, version: &str) -> FeedResult<Self> {
        Ok(Self {
            id: PackageId::new(id)?,
            version: PackageVersion::parse(version)?,
        })
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}
