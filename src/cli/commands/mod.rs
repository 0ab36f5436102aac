//! CLI command implementations

pub mod config;
pub mod delete;
pub mod list;
pub mod push;
pub mod search;
pub mod show;

pub use config::execute as config;
pub use delete::execute as delete;
pub use list::execute as list;
pub use push::execute as push;
pub use search::execute as search;
pub use show::execute as show;

use crate::config::Config;
use crate::repository::PackageRepository;
use tracing::debug;

/// Open the repository described by the loaded configuration
pub(crate) fn open_repository(config: &Config) -> PackageRepository {
    debug!("Opening feed at {}", config.repository.root.display());
    PackageRepository::from_config(&config.repository)
}
