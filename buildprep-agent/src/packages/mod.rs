//! Package backup and restore.
//!
//! Classification and exclusion planning are recomputed on every run; only
//! the backup root and its manifest persist between runs.

pub mod backup;
pub mod classify;
pub mod exclusions;
pub mod manifest;
pub mod restore;

pub use backup::{BackupOutcome, BackupState, PackageBackupManager};
pub use classify::{classify, classify_children, Classification, PackageDirectory};
pub use exclusions::ExclusionSet;
pub use manifest::BackupManifest;
pub use restore::PackageRestoreManager;
