//! pkgfeed - Package Feed Cache Engine
//!
//! Serves a directory of `.nupkg` archives as a package feed, backed by a
//! lazily built in-memory index that stays coherent under concurrent reads,
//! writes and changes made to the directory by other processes.

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod package;
pub mod repository;
pub mod storage;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FeedError, FeedResult};
pub use repository::PackageRepository;
