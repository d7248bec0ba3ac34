//! Stencil CLI - quality metrics for template sets.

use std::io::stdout;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stencil::analyzers::coupling;
use stencil::analyzers::{BatchAnalyzer, BatchResult, CouplingAnalyzer, DependencyGraph};
use stencil::cli::{Cli, Command, OutputFormat};
use stencil::config::Config;
use stencil::core::progress::ProgressTracker;
use stencil::core::{AnalysisContext, Analyzer, Error, FileSet};
use stencil::output::Format;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Serialize)]
struct GraphOutput<'a> {
    graph: &'a DependencyGraph,
    coupling: coupling::Analysis,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load_default(&cli.path).context("loading configuration")?,
    };

    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .map_err(|e| Error::InvalidArgument(format!("--jobs {jobs}: {e}")))?;
    }

    let format = match cli.format {
        OutputFormat::Json => Format::Json,
        OutputFormat::Compact => Format::JsonCompact,
    };

    let batch = analyze_batch(&cli, &config)?;

    match cli.command {
        Command::Analyze => {
            format.format(&batch, &mut stdout())?;
        }
        Command::Graph => {
            let coupling = CouplingAnalyzer::new().analyze(&AnalysisContext::new(&batch, &config))?;
            let output = GraphOutput {
                graph: &batch.graph,
                coupling,
            };
            format.format(&output, &mut stdout())?;
        }
        Command::Report(args) => {
            let report =
                stencil::score::Analyzer::new().analyze(&AnalysisContext::new(&batch, &config))?;
            format.format(&report, &mut stdout())?;
            if let Some(fail_under) = args.fail_under.or(config.scoring.fail_under) {
                report.check_threshold(fail_under)?;
            }
        }
    }

    Ok(())
}

fn analyze_batch(cli: &Cli, config: &Config) -> anyhow::Result<BatchResult> {
    let file_set = FileSet::from_path(&cli.path, config)
        .with_context(|| format!("discovering templates in {}", cli.path.display()))?;
    let inputs = file_set.inputs();
    tracing::debug!("Discovered {} templates under {}", inputs.len(), file_set.root().display());

    let tracker = ProgressTracker::for_terminal(inputs.len(), "Analyzing templates", cli.verbose);
    let batch = BatchAnalyzer::new(config)
        .with_progress(tracker.callback())
        .analyze(&inputs);
    tracker.finish_and_clear();

    for error in &batch.errors {
        tracing::warn!("Skipped {}: {}", error.path, error.message);
    }
    Ok(batch)
}
