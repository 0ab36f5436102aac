//! Search filtering over a snapshot

use crate::cache::CachedPackage;
use crate::package::{PackageManifest, TargetFramework};
use std::collections::BTreeSet;

/// Decides whether a package matches a free-text search term
pub trait TermMatcher: Send + Sync {
    fn matches(&self, manifest: &PackageManifest, term: &str) -> bool;
}

/// Whitespace-tokenized, case-insensitive substring matching over id, title,
/// description and tags. Any matching token is enough.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenMatcher;

impl TermMatcher for TokenMatcher {
    fn matches(&self, manifest: &PackageManifest, term: &str) -> bool {
        let tokens: Vec<String> = term
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if tokens.is_empty() {
            return true;
        }

        let mut haystacks = vec![manifest.identity.id.key().to_string()];
        haystacks.extend(manifest.title.as_deref().map(str::to_lowercase));
        haystacks.extend(manifest.description.as_deref().map(str::to_lowercase));
        haystacks.extend(manifest.tags.iter().map(|t| t.to_lowercase()));

        tokens
            .iter()
            .any(|token| haystacks.iter().any(|h| h.contains(token.as_str())))
    }
}

/// Criteria for [`super::PackageRepository::search`]
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub term: String,
    pub target_frameworks: Vec<TargetFramework>,
    pub allow_prerelease: bool,
}

impl SearchFilter {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Self::default()
        }
    }

    pub fn with_frameworks(mut self, frameworks: impl IntoIterator<Item = TargetFramework>) -> Self {
        self.target_frameworks.extend(frameworks);
        self
    }

    pub fn allow_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    /// Apply the filter chain: term, prerelease, listing, then frameworks
    /// when `framework_filtering` is on and frameworks were requested
    pub fn accepts(
        &self,
        entry: &CachedPackage,
        matcher: &dyn TermMatcher,
        framework_filtering: bool,
    ) -> bool {
        let package = &entry.package;

        matcher.matches(package.manifest(), &self.term)
            && (self.allow_prerelease || !package.is_prerelease())
            && package.is_listed()
            && (!framework_filtering
                || self.target_frameworks.is_empty()
                || frameworks_compatible(
                    entry.metadata.supported_frameworks.as_ref(),
                    &self.target_frameworks,
                ))
    }
}

/// Whether a package supporting `supported` can serve any of `requested`.
/// Packages without framework data are compatible with everything.
pub fn frameworks_compatible(
    supported: Option<&BTreeSet<TargetFramework>>,
    requested: &[TargetFramework],
) -> bool {
    match supported {
        None => true,
        Some(set) if set.is_empty() => true,
        Some(set) => set
            .iter()
            .any(|have| requested.iter().any(|want| have.is_compatible_with(want))),
    }
}
