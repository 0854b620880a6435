//! CLI command definitions for confluence-entrypoint
//!
//! The main entry point is the `Cli` struct. With no subcommand the
//! entrypoint behaves as `start`.

pub mod plan;

use clap::{Parser, Subcommand};
use plan::PlanArgs;
use std::path::PathBuf;

/// Container entrypoint: generates Confluence configuration from the
/// environment, then starts the application.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a YAML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Application install directory (overrides settings)
    #[arg(long, global = true)]
    pub install_dir: Option<PathBuf>,

    /// Application home directory (overrides settings)
    #[arg(long, global = true)]
    pub home_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate configuration and start the application (default)
    Start,

    /// Generate configuration without starting the application
    Render,

    /// Show what would be generated without writing anything
    Plan(PlanArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::parse_from(["confluence-entrypoint"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log, "2");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "confluence-entrypoint",
            "render",
            "--home-dir",
            "/data",
            "-v",
        ]);
        assert!(matches!(cli.command, Some(Command::Render)));
        assert_eq!(cli.home_dir, Some(PathBuf::from("/data")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
