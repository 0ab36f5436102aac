//! Search command - find listed packages

use super::open_repository;
use crate::cli::args::{OutputFormat, SearchArgs};
use crate::config::Config;
use crate::error::FeedResult;
use crate::package::Package;
use crate::ui::{self, UiContext};
use console::style;
use std::sync::Arc;

/// Execute the search command
pub async fn execute(args: SearchArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let repository = open_repository(config);

    if !args.frameworks.is_empty() && !config.repository.enable_framework_filtering {
        ui::step_warn_hint(
            &ctx,
            "Framework filter ignored",
            "Set repository.enable_framework_filtering = true",
        );
    }

    let found = repository
        .search(&args.term, &args.frameworks, args.prerelease)
        .await?;

    match args.format {
        OutputFormat::Table if found.is_empty() => {
            ui::step_info(&ctx, &format!("No packages match '{}'", args.term));
        }
        OutputFormat::Table => print_table(&ctx, &found),
        OutputFormat::Json => {
            let manifests: Vec<_> = found.iter().map(|p| p.manifest()).collect();
            println!("{}", serde_json::to_string_pretty(&manifests)?);
        }
        OutputFormat::Plain => {
            for package in &found {
                println!("{} {}", package.id(), package.version());
            }
        }
    }

    Ok(())
}

fn print_table(ctx: &UiContext, found: &[Arc<Package>]) {
    ui::intro(ctx, "Search results");

    println!(
        "{:<36} {:<18} {}",
        style("ID").bold(),
        style("VERSION").bold(),
        style("DESCRIPTION").bold()
    );
    println!("{}", "-".repeat(86));

    for package in found {
        let description = package
            .manifest()
            .description
            .as_deref()
            .map(first_line)
            .unwrap_or_default();
        println!(
            "{:<36} {:<18} {}",
            package.id(),
            package.version(),
            style(description).dim()
        );
    }

    println!();
    println!("{} package(s)", found.len());
}

/// First line of a description, cut to fit a table column
fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > 60 {
        let cut: String = line.chars().take(57).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
