//! Pulls a fresh copy of the watch app database from a connected device.
//!
//! The bridge streams a tar archive of the app's `databases/<name>` entry to
//! stdout. The archive is unpacked with one leading path component stripped
//! into a staging directory beside the snapshot, then moved into place. The
//! archive and the staging directory are always removed afterwards.

use crate::config::{Config, DeviceConfig};
use crate::error::AcquireError;
use crate::process::run_command;
use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Removes the intermediate archive when dropped, whatever the pull outcome.
struct ArchiveGuard {
    path: PathBuf,
}

impl ArchiveGuard {
    fn new(path: &Path) -> Self {
        ArchiveGuard {
            path: path.to_path_buf(),
        }
    }
}

impl Drop for ArchiveGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!("Removed temporary file: {}", self.path.display()),
                Err(e) => warn!(
                    "Failed to remove temporary file {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}

/// Pulls the device database into the configured snapshot path
pub struct Acquirer {
    device: DeviceConfig,
    snapshot: PathBuf,
    archive: PathBuf,
    extract_dir: PathBuf,
}

impl Acquirer {
    pub fn new(config: &Config) -> Self {
        Acquirer {
            device: config.device.clone(),
            snapshot: config.paths.snapshot.clone(),
            archive: config.paths.archive.clone(),
            extract_dir: config.snapshot_dir(),
        }
    }

    /// Path the snapshot is written to
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot
    }

    /// Checks whether a snapshot from an earlier run is available
    pub fn snapshot_exists(&self) -> bool {
        self.snapshot.exists()
    }

    fn bridge_args(&self) -> Vec<String> {
        vec![
            "exec-out".to_string(),
            format!(
                "run-as {} tar c databases/{}",
                self.device.package_id, self.device.database_name
            ),
        ]
    }

    /// Attempts a pull, returning true only when the snapshot was refreshed.
    ///
    /// Failures are logged; the snapshot from a previous run is left alone.
    pub fn acquire(&self) -> bool {
        info!("Attempting to pull latest database from device...");
        match self.try_acquire() {
            Ok(path) => {
                info!("'{}' is now up to date.", path.display());
                true
            }
            Err(e) => {
                warn!("An error occurred while pulling the database: {}", e);
                false
            }
        }
    }

    /// Pulls and unpacks the device database, returning the snapshot path.
    pub fn try_acquire(&self) -> Result<PathBuf, AcquireError> {
        match fs::remove_file(&self.archive) {
            Ok(()) => debug!("Removed leftover archive: {}", self.archive.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(AcquireError::Io(e)),
        }

        let _guard = ArchiveGuard::new(&self.archive);

        let output = run_command(&self.device.bridge_program, &self.bridge_args(), None)?;
        if output.stdout.is_empty() {
            return Err(AcquireError::EmptyPull);
        }

        fs::write(&self.archive, &output.stdout)?;
        let archive_len = fs::metadata(&self.archive).map(|m| m.len()).unwrap_or(0);
        if archive_len == 0 {
            return Err(AcquireError::EmptyArchive(self.archive.clone()));
        }
        info!(
            "Created temp archive {} ({} bytes)",
            self.archive.display(),
            archive_len
        );

        // tar runs inside a staging directory, so the archive must not be relative
        let archive = if self.archive.is_absolute() {
            self.archive.clone()
        } else {
            std::env::current_dir()?.join(&self.archive)
        };

        // A leftover database next to the snapshot must not count as extracted
        fs::create_dir_all(&self.extract_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(&self.extract_dir)?;

        let tar_args = vec![
            "-x".to_string(),
            "-f".to_string(),
            archive.to_string_lossy().into_owned(),
            "--strip-components=1".to_string(),
        ];
        run_command(&self.device.archive_program, &tar_args, Some(staging.path()))?;

        let extracted = staging.path().join(&self.device.database_name);
        if !extracted.is_file() {
            return Err(AcquireError::ExtractionMissing(
                self.extract_dir.join(&self.device.database_name),
            ));
        }

        fs::rename(&extracted, &self.snapshot)?;
        debug!(
            "Moved {} into {}",
            extracted.display(),
            self.snapshot.display()
        );

        if !self.snapshot.exists() {
            return Err(AcquireError::ExtractionMissing(self.snapshot.clone()));
        }

        Ok(self.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_args() {
        let acquirer = Acquirer::new(&Config::default());
        assert_eq!(
            acquirer.bridge_args(),
            vec![
                "exec-out".to_string(),
                "run-as com.dongxin.watch_app tar c databases/sport.db".to_string()
            ]
        );
    }

    #[test]
    fn test_archive_guard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pull.tar");
        fs::write(&path, b"data").unwrap();
        {
            let _guard = ArchiveGuard::new(&path);
        }
        assert!(!path.exists());
    }
}
