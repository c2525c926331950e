//! dirsnap - Concurrent directory metadata snapshots.
//!
//! Usage:
//!   dirsnap -o OUT DIR...              Snapshot each DIR into OUT/<name>_snapshot.txt
//!   dirsnap -o OUT -s SAFE DIR...      Also move suspicious files into SAFE
//!   dirsnap --config dirsnap.toml DIR  Read defaults from a TOML file
//!   dirsnap --help                     Show help

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dirsnap_core::{ConfigFile, ConflictPolicy, RunSummary, SnapshotConfig, SnapshotError};
use dirsnap_engine::Dispatcher;

/// Exit status for a run in which at least one directory failed.
const EXIT_TASK_FAILED: u8 = 1;
/// Exit status for invalid input, reported before anything runs.
const EXIT_BAD_INPUT: u8 = 2;

#[derive(Parser)]
#[command(
    name = "dirsnap",
    version,
    about = "Snapshot directory metadata and quarantine suspicious files",
    long_about = "dirsnap records the name and modification time of every entry under \
                  each DIR into OUTPUT_DIR/<name>_snapshot.txt, one directory per worker.\n\n\
                  With --safe-dir, files directly inside each DIR whose names look \
                  malicious are moved there after the snapshot is written."
)]
struct Cli {
    /// Directories to snapshot
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Directory receiving the snapshot files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Quarantine directory for suspicious files
    #[arg(short, long)]
    safe_dir: Option<PathBuf>,

    /// Maximum number of directories processed at once
    #[arg(short = 'j', long = "jobs")]
    max_concurrent: Option<usize>,

    /// Maximum number of input directories (0 = unlimited)
    #[arg(long = "max-dirs")]
    max_directories: Option<usize>,

    /// Follow symbolic links while walking
    #[arg(long)]
    follow_symlinks: bool,

    /// What to do when a quarantined name already exists
    #[arg(long, value_enum)]
    on_conflict: Option<ConflictArg>,

    /// TOML file with default settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for the run summary
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Log more (debug level)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConflictArg {
    Overwrite,
    Skip,
    Rename,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Overwrite => ConflictPolicy::Overwrite,
            ConflictArg::Skip => ConflictPolicy::Skip,
            ConflictArg::Rename => ConflictPolicy::Rename,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(ExitCode::from(EXIT_BAD_INPUT));
        }
    };

    debug!(?config, "configuration resolved");

    let dispatcher = match Dispatcher::new(config) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(ExitCode::from(EXIT_BAD_INPUT));
        }
    };
    let tasks = match dispatcher.plan(&cli.dirs) {
        Ok(tasks) => tasks,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(ExitCode::from(EXIT_BAD_INPUT));
        }
    };

    let summary = dispatcher.run(tasks).await;

    match cli.format {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
            println!("{json}");
        }
    }

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_TASK_FAILED))
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge the config file (if any) with command-line flags.
fn build_config(cli: &Cli) -> Result<SnapshotConfig, SnapshotError> {
    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };

    let mut builder = file.into_builder();
    if let Some(dir) = &cli.output_dir {
        builder.output_dir(dir.clone());
    }
    if let Some(dir) = &cli.safe_dir {
        builder.safe_dir(dir.clone());
    }
    if let Some(n) = cli.max_concurrent {
        builder.max_concurrent(n);
    }
    if let Some(n) = cli.max_directories {
        builder.max_directories(Some(n));
    }
    if cli.follow_symlinks {
        builder.follow_symlinks(true);
    }
    if let Some(policy) = cli.on_conflict {
        builder.on_conflict(ConflictPolicy::from(policy));
    }

    Ok(builder.build()?)
}

/// Print a per-directory report followed by the overall verdict.
fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " Run started {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(" {}", summary.summary());
    println!(" Finished in {:.2}s", summary.elapsed.as_secs_f64());
    println!("{}", "─".repeat(60));
    println!();

    for outcome in &summary.results {
        match &outcome.failure {
            None => {
                println!(
                    " ok    {} -> {} ({} entries{})",
                    outcome.source.display(),
                    outcome.artifact.display(),
                    outcome.records,
                    if outcome.first_snapshot { ", new" } else { "" }
                );
                if !outcome.warnings.is_empty() {
                    println!("       {} warning(s)", outcome.warnings.len());
                }
                for found in &outcome.suspicious {
                    match &found.moved_to {
                        Some(to) => println!(
                            "       quarantined {} -> {}",
                            found.path.display(),
                            to.display()
                        ),
                        None => println!("       suspicious  {} (left in place)", found.path.display()),
                    }
                }
                for err in &outcome.quarantine_errors {
                    println!("       {err}");
                }
            }
            Some(failure) => {
                println!(" FAIL  {}: {}", outcome.source.display(), failure);
            }
        }
    }

    println!();
    if summary.is_success() {
        println!("Snapshots created for all specified directories.");
    } else {
        println!(
            "{} of {} directories could not be snapshotted.",
            summary.failed(),
            summary.results.len()
        );
    }
}
