//! pkgfeed - Package Feed Cache Engine
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pkgfeed::cli::{commands, Cli, Commands};
use pkgfeed::config::{Config, ConfigManager};
use pkgfeed::error::FeedResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> FeedResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let loaded = config_manager.load().await;

    // Logging needs the log format from config, so a config error is
    // reported only after the subscriber is installed
    let log_format = loaded
        .as_ref()
        .map(|c| c.general.log_format.clone())
        .unwrap_or_default();
    init_logging(cli.verbose, &log_format);

    let mut config: Config = loaded?;
    if let Some(root) = cli.root {
        debug!("Package root overridden: {}", root.display());
        config.repository.root = root;
    }

    match cli.command {
        Commands::List(args) => commands::list(args, &config).await,
        Commands::Search(args) => commands::search(args, &config).await,
        Commands::Show(args) => commands::show(args, &config).await,
        Commands::Push(args) => commands::push(args, &config).await,
        Commands::Delete(args) => commands::delete(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
    }
}

/// Initialize logging: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, log_format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("pkgfeed=warn"),
        1 => EnvFilter::new("pkgfeed=info"),
        _ => EnvFilter::new("pkgfeed=debug"),
    };

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}
