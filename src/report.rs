use crate::error::ExportError;
use crate::pipeline::{JobOutcome, RunSummary, SnapshotSource};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Machine-readable record of a finished run
#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
pub struct RunReport {
    pub finished_at: DateTime<Utc>,
    pub snapshot: PathBuf,
    pub snapshot_source: SnapshotSource,
    pub jobs_succeeded: usize,
    pub jobs_failed: usize,
    pub measurements_written: usize,
    pub jobs: Vec<JobOutcome>,
}

impl RunReport {
    pub fn new(summary: &RunSummary, finished_at: DateTime<Utc>) -> Self {
        RunReport {
            finished_at,
            snapshot: summary.snapshot.clone(),
            snapshot_source: summary.source,
            jobs_succeeded: summary.succeeded(),
            jobs_failed: summary.failed(),
            measurements_written: summary
                .jobs
                .iter()
                .filter_map(JobOutcome::stats)
                .map(|s| s.measurements)
                .sum(),
            jobs: summary.jobs.clone(),
        }
    }
}

/// Saves the run report to a file as pretty JSON
pub fn save_run_report(report: &RunReport, report_file: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(report)?;
    let mut file = File::create(report_file)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}
