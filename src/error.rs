use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while pulling a fresh snapshot from the device.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("missing command `{command}` on PATH")]
    CommandMissing { command: String },

    #[error("command failed: `{command}` (status: {status}){stderr_suffix}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr_suffix: String,
    },

    #[error("bridge command ran but returned no data (is the device connected?)")]
    EmptyPull,

    #[error("pulled archive `{0}` is empty or does not exist")]
    EmptyArchive(PathBuf),

    #[error("extraction finished but `{0}` was not found")]
    ExtractionMissing(PathBuf),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquireError {
    pub fn from_command_failure(command: String, status: i32, stderr: &[u8]) -> Self {
        let stderr = String::from_utf8_lossy(stderr);
        let trimmed = stderr.trim();
        let stderr_suffix = if trimmed.is_empty() {
            String::new()
        } else {
            format!(": {trimmed}")
        };
        AcquireError::CommandFailed {
            command,
            status,
            stderr_suffix,
        }
    }
}

/// Errors that stop a single extraction job.
#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("database error while processing table {table}: {source}")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv failure: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Errors that end a whole run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no device connected and no local database file found at {0}")]
    NoSnapshot(PathBuf),

    #[error("database file does not exist: {0}")]
    MissingDatabase(PathBuf),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),
}
