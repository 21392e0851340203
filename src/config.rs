//! Run configuration.
//!
//! Every field has a default matching the stock watch app layout, so the
//! exporter runs without any config file. A TOML file may override any subset.

use crate::error::ConfigError;
use crate::flatten::ExtractionJob;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration for an export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON key holding the millisecond timestamp in every metric entry
    pub timestamp_key: String,

    pub device: DeviceConfig,

    pub paths: PathsConfig,

    /// Extraction jobs, run in order
    pub jobs: Vec<ExtractionJob>,
}

/// How to reach the device and unpack what it sends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device bridge executable (adb)
    pub bridge_program: String,

    /// Archive tool used to unpack the pulled tar stream
    pub archive_program: String,

    /// Application package whose private storage holds the database
    pub package_id: String,

    /// Database file name inside the app's `databases/` directory
    pub database_name: String,
}

/// Local file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Cached snapshot of the device database
    pub snapshot: PathBuf,

    /// Intermediate tar file, removed after every pull attempt
    pub archive: PathBuf,

    /// Directory that relative job outputs are written to
    pub output_dir: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            bridge_program: "adb".to_string(),
            archive_program: "tar".to_string(),
            package_id: "com.dongxin.watch_app".to_string(),
            database_name: "sport.db".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from("sport.db"),
            archive: PathBuf::from("sport_backup.tar"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timestamp_key: "currentTime".to_string(),
            device: DeviceConfig::default(),
            paths: PathsConfig::default(),
            jobs: default_jobs(),
        }
    }
}

/// The four metric tables the watch app keeps
pub fn default_jobs() -> Vec<ExtractionJob> {
    vec![
        ExtractionJob::new(
            "HEART_DATA_CACHE",
            "DATA_LIST",
            "hr_value",
            "heart_rate_data.csv",
            "HeartRate",
        ),
        ExtractionJob::new(
            "SLEEP_DATA_CACHE",
            "DATA_LIST",
            "sleepType",
            "sleep_data.csv",
            "SleepValue",
        ),
        ExtractionJob::new(
            "BLOOD_OXYGEN_CACHE",
            "BLOOD_DATA_LIST",
            "blood_oxygen_value",
            "blood_oxygen_data.csv",
            "BloodOxygenValue",
        ),
        ExtractionJob::new(
            "PRESS_DATA_CACHE",
            "DATA_LIST",
            "press_value",
            "stress_data.csv",
            "StressLevel",
        ),
    ]
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Where a job's CSV lands. Absolute job outputs are used as-is.
    pub fn output_path(&self, job: &ExtractionJob) -> PathBuf {
        self.paths.output_dir.join(&job.output)
    }

    /// Directory the snapshot lives in, and where the archive is unpacked
    pub fn snapshot_dir(&self) -> PathBuf {
        match self.paths.snapshot.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
