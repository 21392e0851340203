use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};
use std::path::PathBuf;
use std::process::ExitCode;
use watch_db_exporter::config::Config;
use watch_db_exporter::error::ExportError;
use watch_db_exporter::pipeline::{self, RunOptions};
use watch_db_exporter::report::{save_run_report, RunReport};
use watch_db_exporter::snapshot::describe_snapshot;

#[derive(Parser)]
#[command(author, version, about = "Export watch health metrics to CSV", long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull the database from the device and export every metric to CSV
    Extract {
        /// Use the cached snapshot without contacting the device
        #[arg(long)]
        skip_pull: bool,

        /// Write a JSON report of the run to this file
        #[arg(short, long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// List the tables, columns and row counts of a snapshot
    Inspect {
        /// Snapshot to inspect (defaults to the configured snapshot)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
    },

    /// Generate a template configuration file
    Init {
        /// Output file for the configuration
        #[arg(short, long, default_value = "watch-export.toml")]
        output: PathBuf,
    },
}

fn setup_logging(debug: u8) {
    let level = match debug {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn extract(config: &Config, skip_pull: bool, report: Option<PathBuf>) -> Result<ExitCode> {
    let summary = match pipeline::run(config, RunOptions { skip_pull }) {
        Ok(summary) => summary,
        Err(ExportError::NoSnapshot(path)) => {
            println!(
                "No device connected and no local database file found.\nPlease connect your phone or place a '{}' file in the folder.",
                path.display()
            );
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", summary);

    if let Some(report_path) = report {
        let report = RunReport::new(&summary, chrono::Utc::now());
        save_run_report(&report, &report_path)
            .with_context(|| format!("Failed to write report to {}", report_path.display()))?;
        println!("Run report written to {}", report_path.display());
    }

    Ok(ExitCode::from(summary.exit_code()))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.debug);
    debug!("Debug mode is on (level: {})", cli.debug);

    match cli.command {
        Commands::Extract { skip_pull, report } => {
            let config = load_config(cli.config.as_ref())?;
            extract(&config, skip_pull, report)
        }

        Commands::Inspect { db } => {
            let config = load_config(cli.config.as_ref())?;
            let db = db.unwrap_or_else(|| config.paths.snapshot.clone());
            println!("{}", describe_snapshot(&db)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Init { output } => {
            println!("Generating template configuration file: '{}'", output.display());
            Config::default().save(&output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
