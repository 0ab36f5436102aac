//! Delete command - remove or delist a package

use super::open_repository;
use crate::cli::args::DeleteArgs;
use crate::config::Config;
use crate::error::FeedResult;
use crate::ui::{self, UiContext};

/// Execute the delete command
pub async fn execute(args: DeleteArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let repository = open_repository(config);

    let removed = repository
        .remove_package_by_id(&args.id, &args.version)
        .await?;

    if !removed {
        ui::step_warn_hint(
            &ctx,
            &format!("Package not found: {} {}", args.id, args.version),
            "Nothing was removed",
        );
        return Ok(());
    }

    if config.repository.enable_delisting {
        ui::step_ok(&ctx, &format!("Delisted {} {}", args.id, args.version));
    } else {
        ui::step_ok(&ctx, &format!("Deleted {} {}", args.id, args.version));
    }
    Ok(())
}
