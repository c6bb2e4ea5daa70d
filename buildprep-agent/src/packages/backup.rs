//! One-time baseline backup of the deployed packages.

use super::manifest::BackupManifest;
use crate::config::Config;
use crate::fs::volume;
use crate::fs::walker::{is_empty_dir, scan_all, TreeSummary};
use crate::location::{remove_dir_verified, BackupRoot};
use crate::mirror::{self, log_artifact_path, MirrorRequest, MirrorTool};
use crate::utils::errors::{PrepError, Result};
use crate::utils::format::{format_bytes, format_duration};
use std::path::Path;
use tracing::{info, warn};

/// What is on disk at a backup root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    /// Nothing there
    Absent,
    /// Content without a manifest: an interrupted or failed attempt
    Incomplete,
    /// Manifest present
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupOutcome {
    /// A new backup was taken during this call
    pub created: bool,

    /// Verified totals of the new backup
    pub summary: Option<TreeSummary>,
}

/// Free bytes available for a path on its volume.
pub type SpaceProbe = fn(&Path) -> std::io::Result<u64>;

pub struct PackageBackupManager<'a> {
    config: &'a Config,
    mirror: &'a dyn MirrorTool,
    available_space: SpaceProbe,
}

impl<'a> PackageBackupManager<'a> {
    pub fn new(config: &'a Config, mirror: &'a dyn MirrorTool) -> Self {
        Self {
            config,
            mirror,
            available_space: volume::available_space,
        }
    }

    pub fn with_space_probe(mut self, probe: SpaceProbe) -> Self {
        self.available_space = probe;
        self
    }

    pub fn inspect(&self, root: &BackupRoot) -> Result<BackupState> {
        if BackupManifest::exists_in(&root.path, &self.config.packages.manifest_file) {
            Ok(BackupState::Complete)
        } else if is_empty_dir(&root.path)? {
            Ok(BackupState::Absent)
        } else {
            Ok(BackupState::Incomplete)
        }
    }

    /// Make sure a verified backup of `source` exists at `root`.
    pub async fn backup(&self, root: &BackupRoot, source: &Path, overwrite: bool) -> Result<BackupOutcome> {
        let state = self.inspect(root)?;
        info!(root = %root.path.display(), ?state, overwrite, "Checking package backup");

        match state {
            BackupState::Complete if !overwrite => {
                if let Some(manifest) = BackupManifest::read_from(&root.path, &self.config.packages.manifest_file) {
                    info!(
                        created_at = %manifest.created_at,
                        files = manifest.total_files,
                        size = %format_bytes(manifest.total_bytes),
                        "Package backup already complete, skipping"
                    );
                } else {
                    info!("Package backup already complete, skipping");
                }
                return Ok(BackupOutcome {
                    created: false,
                    summary: None,
                });
            }
            BackupState::Complete => {
                warn!(root = %root.path.display(), "Overwrite requested, discarding existing package backup");
                remove_dir_verified(&root.path).await?;
            }
            BackupState::Incomplete => {
                warn!(root = %root.path.display(), "Package backup has no manifest, treating as corrupt");
                remove_dir_verified(&root.path).await?;
            }
            BackupState::Absent => {}
        }

        let summary = self.create(root, source).await?;
        Ok(BackupOutcome {
            created: true,
            summary: Some(summary),
        })
    }

    async fn create(&self, root: &BackupRoot, source: &Path) -> Result<TreeSummary> {
        let start_time = std::time::Instant::now();

        if !source.is_dir() {
            return Err(PrepError::Config(format!(
                "packages directory {} does not exist",
                source.display()
            )));
        }
        if !volume::probe(&root.path).is_ready() {
            return Err(PrepError::DriveNotReady {
                path: root.path.clone(),
            });
        }
        tokio::fs::create_dir_all(&root.path).await?;

        let source_owned = source.to_path_buf();
        let expected = tokio::task::spawn_blocking(move || scan_all(&source_owned))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        let available = (self.available_space)(&root.path)?;
        info!(
            files = expected.files,
            required = %format_bytes(expected.bytes),
            available = %format_bytes(available),
            "Scanned package source"
        );
        if expected.bytes > available {
            return Err(PrepError::InsufficientSpace {
                path: root.path.clone(),
                required: expected.bytes,
                available,
            });
        }

        let request = MirrorRequest::new(
            source,
            &root.path,
            &self.config.mirror,
            log_artifact_path(&self.config.log_dir(), root.purpose.as_str(), "Backup"),
        );
        let report = mirror::sync(self.mirror, &request).await?;

        if !report.is_benign() {
            return Err(PrepError::MirrorFailed {
                source_path: source.to_path_buf(),
                exit_code: report.exit_code,
                log_path: report.log_path,
            });
        }

        if report.destination != expected {
            return Err(PrepError::BackupVerificationFailed {
                path: root.path.clone(),
                expected_files: expected.files,
                expected_bytes: expected.bytes,
                actual_files: report.destination.files,
                actual_bytes: report.destination.bytes,
            });
        }

        let manifest_path = BackupManifest::new(source, expected)
            .write_to(&root.path, &self.config.packages.manifest_file)?;

        info!(
            files = expected.files,
            size = %format_bytes(expected.bytes),
            elapsed = %format_duration(start_time.elapsed().as_secs()),
            manifest = %manifest_path.display(),
            "Package backup created and verified"
        );
        Ok(expected)
    }
}
