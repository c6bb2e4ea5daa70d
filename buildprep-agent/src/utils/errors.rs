//! Custom error types for the build-prep agent.

use std::path::PathBuf;
use thiserror::Error;

/// Broad failure class, used by the orchestrator to report what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable path or setting; nothing was touched.
    Configuration,
    /// Disk space or drive availability.
    Resource,
    /// Post-copy cross-check mismatch.
    Verification,
    /// Mirror tool, database script or service control failed.
    ExternalTool,
    /// Plain filesystem / serialization failure.
    Io,
}

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("No usable backup path for {purpose}: nothing configured and no candidate drive is ready")]
    NoBackupPathAvailable { purpose: String },

    #[error("Deployment packages path could not be resolved")]
    PackagesPathUnresolved,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to remove {}: directory still exists after deletion", path.display())]
    CleanupFailed { path: PathBuf },

    #[error("Drive for {} is not ready", path.display())]
    DriveNotReady { path: PathBuf },

    #[error("Insufficient space on {}: {required} bytes required, {available} bytes available", path.display())]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    #[error(
        "Backup verification failed for {}: expected {expected_files} files / {expected_bytes} bytes, found {actual_files} files / {actual_bytes} bytes",
        path.display()
    )]
    BackupVerificationFailed {
        path: PathBuf,
        expected_files: usize,
        expected_bytes: u64,
        actual_files: usize,
        actual_bytes: u64,
    },

    #[error("Backup missing at {}", path.display())]
    BackupMissing { path: PathBuf },

    #[error("Mirror of {} failed with exit code {exit_code} (log: {})", source_path.display(), log_path.display())]
    MirrorFailed {
        source_path: PathBuf,
        exit_code: i32,
        log_path: PathBuf,
    },

    #[error("Restore into {} failed with mirror exit code {exit_code} (log: {})", destination.display(), log_path.display())]
    RestoreFailed {
        destination: PathBuf,
        exit_code: i32,
        log_path: PathBuf,
    },

    #[error("Mirror tool error: {0}")]
    MirrorTool(String),

    #[error("Database script error: {0}")]
    DatabaseScript(String),

    #[error("Service control error: {0}")]
    ServiceControl(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PrepError {
    /// Map the error onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrepError::NoBackupPathAvailable { .. }
            | PrepError::PackagesPathUnresolved
            | PrepError::Config(_)
            | PrepError::Settings(_) => ErrorKind::Configuration,
            PrepError::DriveNotReady { .. }
            | PrepError::InsufficientSpace { .. }
            | PrepError::CleanupFailed { .. }
            | PrepError::BackupMissing { .. } => ErrorKind::Resource,
            PrepError::BackupVerificationFailed { .. } => ErrorKind::Verification,
            PrepError::MirrorFailed { .. }
            | PrepError::RestoreFailed { .. }
            | PrepError::MirrorTool(_)
            | PrepError::DatabaseScript(_)
            | PrepError::ServiceControl(_) => ErrorKind::ExternalTool,
            PrepError::Io(_) | PrepError::Serialization(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
