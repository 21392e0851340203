use crate::acquire::Acquirer;
use crate::config::Config;
use crate::error::ExportError;
use crate::flatten::{flatten, FlattenStats};
use log::{error, info, warn};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the snapshot used by a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Pulled from the device during this run
    Fresh,
    /// Left over from an earlier run
    Cached,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Use the cached snapshot without contacting the device
    pub skip_pull: bool,
}

/// Result of one extraction job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub table: String,
    pub output: PathBuf,
    pub result: Result<FlattenStats, String>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn stats(&self) -> Option<FlattenStats> {
        self.result.as_ref().ok().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub snapshot: PathBuf,
    pub source: SnapshotSource,
    pub jobs: Vec<JobOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.succeeded()
    }

    /// Process exit status: non-zero when no job produced output
    pub fn exit_code(&self) -> u8 {
        if self.succeeded() > 0 {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            SnapshotSource::Fresh => "fresh pull",
            SnapshotSource::Cached => "cached copy",
        };
        writeln!(f, "Snapshot: {} ({})", self.snapshot.display(), source)?;
        for job in &self.jobs {
            match &job.result {
                Ok(stats) => writeln!(
                    f,
                    "  {} -> {}: {} measurements from {} rows ({} skipped)",
                    job.table,
                    job.output.display(),
                    stats.measurements,
                    stats.rows_scanned,
                    stats.rows_skipped
                )?,
                Err(e) => writeln!(f, "  {} -> FAILED: {}", job.table, e)?,
            }
        }
        write!(
            f,
            "{} of {} jobs succeeded",
            self.succeeded(),
            self.jobs.len()
        )
    }
}

/// Decides which snapshot to use: a fresh pull when possible, else the cached copy.
pub fn resolve_snapshot(
    acquirer: &Acquirer,
    options: RunOptions,
) -> Result<SnapshotSource, ExportError> {
    if options.skip_pull {
        info!("Skipping device pull");
    } else if acquirer.acquire() {
        info!("Database pull successful. Processing fresh data...");
        return Ok(SnapshotSource::Fresh);
    } else {
        warn!("Could not pull the latest database.");
    }

    if acquirer.snapshot_exists() {
        info!(
            "Using existing database file '{}'.",
            acquirer.snapshot_path().display()
        );
        Ok(SnapshotSource::Cached)
    } else {
        Err(ExportError::NoSnapshot(acquirer.snapshot_path().to_path_buf()))
    }
}

/// Runs every configured job against an open connection. Failures stay inside their job.
pub fn run_jobs(conn: &Connection, config: &Config) -> Vec<JobOutcome> {
    config
        .jobs
        .iter()
        .map(|job| {
            let output = config.output_path(job);
            let result = flatten(conn, job, &config.timestamp_key, &output).map_err(|e| {
                error!("{}", e);
                e.to_string()
            });
            JobOutcome {
                table: job.table.clone(),
                output,
                result,
            }
        })
        .collect()
}

fn open_snapshot(path: &Path) -> Result<Connection, ExportError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    info!("Connected to the database successfully.");
    Ok(conn)
}

/// Acquire, fall back, then extract every job from one read-only connection.
pub fn run(config: &Config, options: RunOptions) -> Result<RunSummary, ExportError> {
    let acquirer = Acquirer::new(config);
    let source = resolve_snapshot(&acquirer, options)?;

    fs::create_dir_all(&config.paths.output_dir)?;

    let conn = open_snapshot(acquirer.snapshot_path())?;
    let jobs = run_jobs(&conn, config);

    match conn.close() {
        Ok(()) => info!("Database connection closed."),
        Err((_, e)) => warn!("Failed to close database connection: {}", e),
    }

    Ok(RunSummary {
        snapshot: acquirer.snapshot_path().to_path_buf(),
        source,
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(table: &str, ok: bool) -> JobOutcome {
        JobOutcome {
            table: table.to_string(),
            output: PathBuf::from(format!("{}.csv", table)),
            result: if ok {
                Ok(FlattenStats::default())
            } else {
                Err("no such table".to_string())
            },
        }
    }

    #[test]
    fn test_exit_code_zero_when_any_job_succeeds() {
        let summary = RunSummary {
            snapshot: PathBuf::from("sport.db"),
            source: SnapshotSource::Cached,
            jobs: vec![outcome("A", false), outcome("B", true)],
        };
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_non_zero_when_all_jobs_fail() {
        let summary = RunSummary {
            snapshot: PathBuf::from("sport.db"),
            source: SnapshotSource::Fresh,
            jobs: vec![outcome("A", false), outcome("B", false)],
        };
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            snapshot: PathBuf::from("sport.db"),
            source: SnapshotSource::Cached,
            jobs: vec![outcome("HEART_DATA_CACHE", true), outcome("PRESS_DATA_CACHE", false)],
        };
        let text = summary.to_string();
        assert!(text.contains("cached copy"));
        assert!(text.contains("PRESS_DATA_CACHE -> FAILED: no such table"));
        assert!(text.ends_with("1 of 2 jobs succeeded"));
    }
}
