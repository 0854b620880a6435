//! Plan subcommand
//!
//! Resolves every target in memory and prints the result.

use crate::format::OutputFormat;
use clap::Args;

/// Arguments for the plan subcommand
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Output format: markdown (default), json, or xml
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT", value_parser = parse_format)]
    pub format: OutputFormat,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str(s)
        .ok_or_else(|| format!("Unknown format '{}'. Use: markdown, json, or xml", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_default_format() {
        let cli = Cli::parse_from(["confluence-entrypoint", "plan"]);
        match cli.command {
            Some(Command::Plan(args)) => assert_eq!(args.format, OutputFormat::Markdown),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_xml_format() {
        let cli = Cli::parse_from(["confluence-entrypoint", "plan", "--format", "xml"]);
        match cli.command {
            Some(Command::Plan(args)) => assert_eq!(args.format, OutputFormat::Raw),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["confluence-entrypoint", "plan", "-f", "yaml"]).is_err());
    }
}
