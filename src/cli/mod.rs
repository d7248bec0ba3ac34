//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Stencil - quality metrics for Twig and Jinja-style template sets.
#[derive(Parser)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of templates to analyze
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze every template and print the batch result
    #[command(alias = "a")]
    Analyze,

    /// Print the dependency graph with coupling analysis
    #[command(alias = "dag")]
    Graph,

    /// Score all quality dimensions
    #[command(alias = "score")]
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// Fail when the overall score is below this value
    #[arg(long)]
    pub fail_under: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    /// Single-line JSON
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_path() {
        let cli = Cli::try_parse_from(["stencil", "analyze"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_custom_path() {
        let cli = Cli::try_parse_from(["stencil", "-p", "/tmp", "graph"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("/tmp"));
        assert!(matches!(cli.command, Command::Graph));
    }

    #[test]
    fn test_cli_format_compact() {
        let cli = Cli::try_parse_from(["stencil", "-f", "compact", "analyze"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Compact);
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["stencil", "-f", "yaml", "analyze"]).is_err());
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::try_parse_from(["stencil", "-c", "stencil.toml", "analyze"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("stencil.toml")));
    }

    #[test]
    fn test_cli_verbose_and_jobs() {
        let cli = Cli::try_parse_from(["stencil", "-v", "-j", "4", "analyze"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.jobs, Some(4));
    }

    #[test]
    fn test_cli_report_fail_under() {
        let cli = Cli::try_parse_from(["stencil", "report", "--fail-under", "75"]).unwrap();
        match cli.command {
            Command::Report(args) => assert_eq!(args.fail_under, Some(75.0)),
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn test_cli_score_alias() {
        let cli = Cli::try_parse_from(["stencil", "score"]).unwrap();
        match cli.command {
            Command::Report(args) => assert_eq!(args.fail_under, None),
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["stencil"]).is_err());
    }
}
