//! List command - show packages in the feed

use super::open_repository;
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::FeedResult;
use crate::package::{DerivedMetadata, Package};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::sync::Arc;

/// One row of machine-readable list output
#[derive(Serialize)]
struct PackageRow<'a> {
    id: String,
    version: String,
    listed: bool,
    title: Option<&'a str>,
    metadata: &'a DerivedMetadata,
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> FeedResult<()> {
    let repository = open_repository(config);
    let entries: Vec<_> = repository
        .get_packages_with_metadata()
        .await?
        .into_iter()
        .filter(|(package, _)| args.prerelease || !package.is_prerelease())
        .collect();

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No packages");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[(Arc<Package>, DerivedMetadata)]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Packages");

    println!(
        "{:<36} {:<18} {:<10} {:<10} {:<8}",
        style("ID").bold(),
        style("VERSION").bold(),
        style("SIZE").bold(),
        style("LATEST").bold(),
        style("LISTED").bold()
    );
    println!("{}", "-".repeat(86));

    for (package, metadata) in entries {
        let latest = if metadata.is_latest_version {
            style("latest").green()
        } else if metadata.is_absolute_latest_version {
            style("newest").yellow()
        } else {
            style("-").dim()
        };
        let listed = if package.is_listed() {
            style("yes").green()
        } else {
            style("no").dim()
        };

        println!(
            "{:<36} {:<18} {:<10} {:<10} {:<8}",
            package.id(),
            package.version(),
            metadata.display_size(),
            latest,
            listed
        );
    }

    println!();
    println!("{} package(s)", entries.len());
}

fn print_json(entries: &[(Arc<Package>, DerivedMetadata)]) -> FeedResult<()> {
    let rows: Vec<_> = entries
        .iter()
        .map(|(package, metadata)| PackageRow {
            id: package.id().to_string(),
            version: package.version().to_string(),
            listed: package.is_listed(),
            title: package.manifest().title.as_deref(),
            metadata,
        })
        .collect();
    let json = serde_json::to_string_pretty(&rows)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(entries: &[(Arc<Package>, DerivedMetadata)]) {
    for (package, _) in entries {
        println!("{} {}", package.id(), package.version());
    }
}
