// Copyright 2026 Tomato Tracker Contributors
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tomato_tracker::cli;
use tomato_tracker::cli::scrape_cmd::ScrapeArgs;
use tomato_tracker::TrackerError;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tomato-tracker",
    about = "Tomato Tracker — log critic and audience review scores over time",
    version,
    after_help = "Run 'tomato-tracker <command> --help' for details on each command.\nRun 'tomato-tracker' with no command to scrape once with the configured defaults."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the page once and append every segment's scores
    Scrape(ScrapeArgs),
    /// Show recent records from a segment log
    History {
        /// Segment name (e.g. "critics", "audience")
        segment: String,
        /// Number of most recent records to show (0 for all)
        #[arg(long, default_value = "20")]
        limit: usize,
        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory holding the segment logs
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Check environment and diagnose issues
    Doctor {
        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

/// Log subscriber for the global flags; `--json` switches log lines to JSON
/// objects as well.
fn log_subscriber<W>(
    verbose: bool,
    quiet: bool,
    json: bool,
    writer: W,
) -> Box<dyn tracing::Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tomato_tracker={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    cli::output::init(cli.json, cli.quiet);
    let subscriber = log_subscriber(cli.verbose, cli.quiet, cli.json, std::io::stderr);
    let _ = tracing::subscriber::set_global_default(subscriber);

    let result = match cli.command {
        // No subcommand → one scrape with the configured defaults
        None => cli::scrape_cmd::run(&ScrapeArgs::default()).await,

        Some(Commands::Scrape(args)) => cli::scrape_cmd::run(&args).await,
        Some(Commands::History {
            segment,
            limit,
            config,
            output_dir,
        }) => cli::history_cmd::run(&segment, limit, config.as_deref(), output_dir.as_deref()),
        Some(Commands::Doctor { config }) => cli::doctor::run(config.as_deref()).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tomato-tracker", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        let kind = e
            .downcast_ref::<TrackerError>()
            .map(|t| t.kind().as_str())
            .unwrap_or("other");
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "kind": kind,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
