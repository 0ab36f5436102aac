//! Show command - derived metadata for one package id

use super::open_repository;
use crate::cli::args::{OutputFormat, ShowArgs};
use crate::config::Config;
use crate::error::{FeedError, FeedResult};
use crate::package::{DerivedMetadata, Package};
use crate::ui::{self, UiContext};
use std::sync::Arc;

/// Execute the show command
pub async fn execute(args: ShowArgs, config: &Config) -> FeedResult<()> {
    let repository = open_repository(config);

    let packages = match args.version {
        Some(ref version) => repository
            .find_package(&args.id, version)
            .await?
            .into_iter()
            .collect(),
        None => repository.find_packages_by_id(&args.id).await?,
    };

    let mut entries = Vec::with_capacity(packages.len());
    for package in packages {
        if let Some(entry) = repository.get_metadata_package(&package).await? {
            entries.push(entry);
        }
    }

    if entries.is_empty() {
        let wanted = match args.version {
            Some(version) => format!("{} {}", args.id, version),
            None => args.id,
        };
        return Err(FeedError::User(format!("Package not found: {}", wanted)));
    }

    match args.format {
        OutputFormat::Json => {
            let json: Vec<_> = entries
                .iter()
                .map(|(package, metadata)| {
                    serde_json::json!({
                        "manifest": package.manifest(),
                        "listed": package.is_listed(),
                        "metadata": metadata,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Plain => {
            for (package, metadata) in &entries {
                println!(
                    "{} {} {}",
                    package.id(),
                    package.version(),
                    metadata.content_hash_base64
                );
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            for (package, metadata) in &entries {
                print_details(&ctx, package, metadata);
            }
        }
    }

    Ok(())
}

fn print_details(ctx: &UiContext, package: &Arc<Package>, metadata: &DerivedMetadata) {
    let manifest = package.manifest();
    ui::section(ctx, &package.to_string());

    if let Some(ref title) = manifest.title {
        ui::key_value(ctx, "Title", title);
    }
    if !manifest.authors.is_empty() {
        ui::key_value(ctx, "Authors", &manifest.authors.join(", "));
    }
    ui::key_value(ctx, "Listed", yes_no(package.is_listed()));
    ui::key_value(ctx, "Size", &metadata.display_size());
    ui::key_value(ctx, "Hash (SHA512)", &metadata.content_hash_base64);
    ui::key_value(ctx, "Created", &metadata.created_at.to_rfc3339());
    ui::key_value(ctx, "Modified", &metadata.last_modified_at.to_rfc3339());
    ui::key_value(ctx, "Path", &metadata.full_path.display().to_string());
    ui::key_value_status(
        ctx,
        "Latest",
        yes_no(metadata.is_latest_version),
        metadata.is_latest_version,
    );
    ui::key_value_status(
        ctx,
        "Absolute latest",
        yes_no(metadata.is_absolute_latest_version),
        metadata.is_absolute_latest_version,
    );
    if let Some(ref frameworks) = metadata.supported_frameworks {
        let names: Vec<_> = frameworks.iter().map(|f| f.short_name()).collect();
        ui::key_value(ctx, "Frameworks", &names.join(", "));
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
