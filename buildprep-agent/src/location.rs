//! Backup root resolution.
//!
//! A backup root is `<base>/<purpose>`. The base comes from configuration
//! when one is set; otherwise the first ready candidate volume is chosen and
//! persisted so later runs reuse it.

use crate::config::Config;
use crate::fs::volume::{self, VolumeStatus};
use crate::fs::walker::is_empty_dir;
use crate::packages::manifest::BackupManifest;
use crate::settings::{SettingsStore, BACKUP_PATH_KEY};
use crate::utils::errors::{PrepError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPurpose {
    Packages,
    Databases,
}

impl BackupPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupPurpose::Packages => "Packages",
            BackupPurpose::Databases => "Databases",
        }
    }
}

impl fmt::Display for BackupPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved, existing backup directory for one purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRoot {
    pub path: PathBuf,
    pub purpose: BackupPurpose,
}

pub struct BackupPathResolver<'a> {
    explicit: Option<&'a Path>,
    candidates: &'a [PathBuf],
    manifest_name: &'a str,
}

impl<'a> BackupPathResolver<'a> {
    pub fn new(explicit: Option<&'a Path>, candidates: &'a [PathBuf], manifest_name: &'a str) -> Self {
        Self {
            explicit,
            candidates,
            manifest_name,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(
            config.paths.backup_dir.as_deref(),
            &config.paths.backup_candidates,
            &config.packages.manifest_file,
        )
    }

    /// Resolve (and create) the backup root for `purpose`.
    pub async fn resolve(&self, purpose: BackupPurpose, settings: &mut SettingsStore) -> Result<BackupRoot> {
        let configured = self
            .explicit
            .map(Path::to_path_buf)
            .or_else(|| settings.get(BACKUP_PATH_KEY).map(PathBuf::from));

        let (base, newly_chosen) = match configured {
            Some(base) => (base, false),
            None => {
                let base = self.first_ready_candidate().ok_or_else(|| PrepError::NoBackupPathAvailable {
                    purpose: purpose.to_string(),
                })?;
                (base, true)
            }
        };

        let root = BackupRoot {
            path: base.join(purpose.as_str()),
            purpose,
        };

        // Only package roots carry a manifest; a database root holds finished
        // `.bak` files that must survive a re-probe.
        if newly_chosen && purpose == BackupPurpose::Packages {
            self.remove_stale(&root.path).await?;
        }
        tokio::fs::create_dir_all(&root.path).await?;

        if newly_chosen {
            settings.set(BACKUP_PATH_KEY, &base.to_string_lossy())?;
            info!(base = %base.display(), "Selected backup base from candidates");
        }

        info!(purpose = %purpose, path = %root.path.display(), "Resolved backup root");
        Ok(root)
    }

    fn first_ready_candidate(&self) -> Option<PathBuf> {
        for candidate in self.candidates {
            match volume::probe(candidate) {
                VolumeStatus::Ready { root, available } => {
                    debug!(candidate = %candidate.display(), volume = %root.display(), available, "Candidate ready");
                    return Some(candidate.clone());
                }
                VolumeStatus::NotReady { root } => {
                    debug!(candidate = %candidate.display(), volume = %root.display(), "Candidate drive not ready");
                }
                VolumeStatus::Rootless => {
                    debug!(candidate = %candidate.display(), "Candidate has no root, skipping");
                }
            }
        }
        None
    }

    /// Leftovers from an earlier failed attempt on a freshly chosen base.
    async fn remove_stale(&self, root: &Path) -> Result<()> {
        if is_empty_dir(root)? || BackupManifest::exists_in(root, self.manifest_name) {
            return Ok(());
        }

        warn!(path = %root.display(), "Removing stale backup content without a manifest");
        remove_dir_verified(root).await
    }
}

/// Delete `path` recursively and confirm it is gone.
pub async fn remove_dir_verified(path: &Path) -> Result<()> {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Recursive delete reported an error");
        }
    }

    if tokio::fs::try_exists(path).await.unwrap_or(true) {
        return Err(PrepError::CleanupFailed {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
