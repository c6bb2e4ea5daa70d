//! Bulk directory mirroring.
//!
//! The copy itself is done by an external tool behind [`MirrorTool`]. Callers
//! never look at raw process output: [`sync`] runs the tool and hands back a
//! [`SyncReport`] whose totals come from an independent scan of the
//! destination.

pub mod log;
pub mod robocopy;

#[cfg(test)]
pub(crate) mod fake;

use crate::config::MirrorConfig;
use crate::fs::walker::{scan_tree, ScanFilter, TreeSummary};
use crate::packages::exclusions::ExclusionSet;
use crate::utils::errors::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use robocopy::RobocopyMirror;

/// Highest exit code meaning "completed, possibly with differences".
pub const MAX_BENIGN_EXIT_CODE: i32 = 7;

pub fn is_benign_exit(code: i32) -> bool {
    (0..=MAX_BENIGN_EXIT_CODE).contains(&code)
}

/// One mirror invocation.
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub source: PathBuf,
    pub destination: PathBuf,

    /// Delete destination content missing from the source
    pub mirror_deletions: bool,

    pub exclusions: ExclusionSet,
    pub retry_count: u32,
    pub retry_wait_secs: u32,
    pub threads: Option<u32>,
    pub log_path: PathBuf,
}

impl MirrorRequest {
    pub fn new(source: &Path, destination: &Path, settings: &MirrorConfig, log_path: PathBuf) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mirror_deletions: true,
            exclusions: ExclusionSet::default(),
            retry_count: settings.retry_count,
            retry_wait_secs: settings.retry_wait_secs,
            threads: settings.threads,
            log_path,
        }
    }

    pub fn excluding(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }
}

/// What the tool itself reported.
#[derive(Debug, Clone, Default)]
pub struct MirrorOutcome {
    pub exit_code: i32,
    pub log_lines: Vec<String>,
}

/// A bulk mirroring capability supplied by the environment.
#[async_trait]
pub trait MirrorTool: Send + Sync {
    async fn run(&self, request: &MirrorRequest) -> Result<MirrorOutcome>;
}

/// Outcome of one mirror invocation plus a fresh scan of the destination.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub exit_code: i32,
    pub log_path: PathBuf,
    pub log_lines: Vec<String>,
    pub destination: TreeSummary,
}

impl SyncReport {
    pub fn is_benign(&self) -> bool {
        is_benign_exit(self.exit_code)
    }
}

/// Run `request` through `tool` and rescan the destination.
///
/// Never fails on the exit code; callers decide what an out-of-range code
/// means for their phase.
pub async fn sync(tool: &dyn MirrorTool, request: &MirrorRequest) -> Result<SyncReport> {
    if let Some(parent) = request.log_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!(
        source = %request.source.display(),
        destination = %request.destination.display(),
        excluded_files = request.exclusions.files.len(),
        excluded_dirs = request.exclusions.dirs.len(),
        "Starting mirror"
    );

    let outcome = tool.run(request).await?;
    if !is_benign_exit(outcome.exit_code) {
        warn!(exit_code = outcome.exit_code, log = %request.log_path.display(), "Mirror reported failure");
    }

    let destination = request.destination.clone();
    let exclusions = request.exclusions.clone();
    let summary = tokio::task::spawn_blocking(move || {
        scan_tree(
            &destination,
            ScanFilter {
                excluded_files: &exclusions.files,
                excluded_dirs: &exclusions.dirs,
            },
        )
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

    Ok(SyncReport {
        exit_code: outcome.exit_code,
        log_path: request.log_path.clone(),
        log_lines: outcome.log_lines,
        destination: summary,
    })
}

/// `<dir>/<Purpose><Operation>_<timestamp>.log`
pub fn log_artifact_path(dir: &Path, purpose: &str, operation: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{}{}_{}.log", purpose, operation, stamp))
}

/// Read a log artifact as lines. A missing artifact reads as empty.
pub(crate) async fn read_log_lines(path: &Path) -> Result<Vec<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(log = %path.display(), "Mirror log artifact not found");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::fake::FakeMirror;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_benign_exit_range() {
        assert!(is_benign_exit(0));
        assert!(is_benign_exit(1));
        assert!(is_benign_exit(7));
        assert!(!is_benign_exit(8));
        assert!(!is_benign_exit(16));
        assert!(!is_benign_exit(-1));
    }

    #[test]
    fn test_log_artifact_path_shape() {
        let path = log_artifact_path(Path::new("/logs"), "Packages", "Restore");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("PackagesRestore_"));
        assert!(name.ends_with(".log"));
    }

    #[tokio::test]
    async fn test_sync_rescans_destination() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("src");
        let dest = temp_dir.path().join("dst");
        fs::create_dir_all(source.join("Ledger"))?;
        fs::write(source.join("Ledger/a.dll"), b"abcd")?;
        fs::write(source.join("top.txt"), b"12")?;

        let request = MirrorRequest::new(
            &source,
            &dest,
            &MirrorConfig::default(),
            temp_dir.path().join("logs/run.log"),
        );
        let report = sync(&FakeMirror::new(), &request).await?;

        assert!(report.is_benign());
        assert_eq!(report.destination, TreeSummary { files: 2, bytes: 6 });
        assert!(report.log_path.is_file());
        Ok(())
    }

    #[tokio::test]
    async fn test_sync_does_not_fail_on_error_exit() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir_all(temp_dir.path().join("src"))?;
        let request = MirrorRequest::new(
            &temp_dir.path().join("src"),
            &temp_dir.path().join("dst"),
            &MirrorConfig::default(),
            temp_dir.path().join("run.log"),
        );
        let report = sync(&FakeMirror::new().with_exit_code(16), &request).await?;

        assert!(!report.is_benign());
        assert_eq!(report.exit_code, 16);
        Ok(())
    }
}
