//! Push command - add a package archive to the feed

use super::open_repository;
use crate::cli::args::PushArgs;
use crate::config::Config;
use crate::error::{FeedError, FeedResult};
use crate::package::Package;
use crate::ui::{TaskSpinner, UiContext};

/// Execute the push command
pub async fn execute(args: PushArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let repository = open_repository(config);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Pushing {}...", args.file.display()));

    let result = async {
        let package = Package::from_file(repository.reader(), &args.file).await?;
        repository.add_package(&package).await?;
        Ok::<_, FeedError>(package)
    }
    .await;

    match result {
        Ok(package) => {
            spinner.stop(&format!(
                "Pushed {} to {}",
                package,
                repository.root().display()
            ));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Push failed");
            Err(e)
        }
    }
}
