//! CLI argument definitions using clap derive

use crate::package::{PackageVersion, TargetFramework};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pkgfeed - Package Feed Cache Engine
///
/// Lists, searches, pushes and removes packages in a local package feed.
#[derive(Parser, Debug)]
#[command(name = "pkgfeed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PKGFEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Package directory (overrides repository.root)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List packages in the feed
    List(ListArgs),

    /// Search listed packages
    Search(SearchArgs),

    /// Show derived metadata for a package
    Show(ShowArgs),

    /// Add a package archive to the feed
    Push(PushArgs),

    /// Remove (or delist) a package
    Delete(DeleteArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Include prerelease versions
    #[arg(long)]
    pub prerelease: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the search command
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Search term (matches id, title, description and tags)
    #[arg(default_value = "")]
    pub term: String,

    /// Only packages compatible with this target framework (repeatable)
    #[arg(long = "framework", value_parser = parse_framework)]
    pub frameworks: Vec<TargetFramework>,

    /// Include prerelease versions
    #[arg(long)]
    pub prerelease: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Package id (case-insensitive)
    pub id: String,

    /// Exact version (all versions when omitted)
    #[arg(id = "package_version", value_name = "VERSION", value_parser = parse_version)]
    pub version: Option<PackageVersion>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the push command
#[derive(Parser, Debug)]
pub struct PushArgs {
    /// Path to a .nupkg archive
    pub file: PathBuf,
}

/// Arguments for the delete command
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Package id (case-insensitive)
    pub id: String,

    /// Package version
    #[arg(id = "package_version", value_name = "VERSION", value_parser = parse_version)]
    pub version: PackageVersion,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

fn parse_version(s: &str) -> Result<PackageVersion, String> {
    PackageVersion::parse(s).map_err(|e| e.to_string())
}

fn parse_framework(s: &str) -> Result<TargetFramework, String> {
    TargetFramework::parse(s).ok_or_else(|| format!("invalid target framework: '{s}'"))
}
