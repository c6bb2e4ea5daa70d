//! Backup completion manifest.
//!
//! The manifest is written into a backup root only after the copy has been
//! verified. Its presence alone marks the backup complete; the JSON payload is
//! informational and a backup with an unreadable manifest still counts.

use crate::fs::walker::TreeSummary;
use crate::utils::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MANIFEST_VERSION: u32 = 1;

/// Manifest payload, serialized under the configured sentinel name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub version: u32,
    /// Local time the backup was verified, `%Y-%m-%d %H:%M:%S`
    pub created_at: String,
    pub host: String,
    pub source: PathBuf,
    pub total_files: usize,
    pub total_bytes: u64,
}

impl BackupManifest {
    pub fn new(source: &Path, summary: TreeSummary) -> Self {
        Self {
            version: MANIFEST_VERSION,
            created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            host: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
            source: source.to_path_buf(),
            total_files: summary.files,
            total_bytes: summary.bytes,
        }
    }

    pub fn path_in(root: &Path, name: &str) -> PathBuf {
        root.join(name)
    }

    pub fn exists_in(root: &Path, name: &str) -> bool {
        Self::path_in(root, name).is_file()
    }

    pub fn write_to(&self, root: &Path, name: &str) -> Result<PathBuf> {
        let path = Self::path_in(root, name);
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }

    /// Read the payload back. `None` when absent or unparseable.
    pub fn read_from(root: &Path, name: &str) -> Option<Self> {
        let content = std::fs::read(Self::path_in(root, name)).ok()?;
        match serde_json::from_slice(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "Backup manifest is not readable");
                None
            }
        }
    }
}
