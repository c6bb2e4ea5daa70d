//! Configuration management for the build-prep agent.
//!
//! Loaded once from an optional TOML file, then command-line overrides are
//! applied. The resulting value is immutable and passed by reference to every
//! component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub packages: PackagesConfig,
    pub mirror: MirrorConfig,
    pub database: DatabaseConfig,
    pub service: ServiceConfig,
    pub run: RunConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Live deployment packages directory
    pub packages_dir: Option<PathBuf>,

    /// Build SDK root; relative script paths resolve against it
    pub sdk_dir: Option<PathBuf>,

    /// Explicit backup base directory (skips candidate probing)
    pub backup_dir: Option<PathBuf>,

    /// Backup base candidates probed in order when nothing is configured
    pub backup_candidates: Vec<PathBuf>,

    /// Where mirror log artifacts go
    pub log_dir: Option<PathBuf>,

    /// Persisted settings (chosen backup base)
    pub settings_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Subdirectory holding a package's descriptor documents
    pub descriptor_dir: String,

    /// Extension of descriptor documents (without dot)
    pub descriptor_extension: String,

    /// Marker file flagging a directory as customized in place
    pub customization_marker: String,

    /// Per-package metadata-location file, excluded in safe restores
    pub metadata_file: String,

    /// Sentinel written once a backup is verified
    pub manifest_file: String,

    /// Restore every file, ignoring classification
    pub restore_all_files: bool,

    /// Discard an existing complete backup and take a new one
    pub overwrite_backup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Mirror program to invoke
    pub program: String,

    /// Per-file retry attempts
    pub retry_count: u32,

    /// Delay between per-file retries
    pub retry_wait_secs: u32,

    /// Copy worker threads handed to the mirror tool
    pub threads: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backup/restore script; the database branch is skipped without one
    pub script: Option<PathBuf>,

    /// Interpreter used to run the script (e.g. `pwsh`, `bash`)
    pub interpreter: Option<String>,

    /// Database name
    pub name: String,

    /// Database server
    pub server: String,

    /// Backup file to restore instead of taking a backup
    pub backup_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Deployment service stopped before package work
    pub name: Option<String>,

    /// Stop command; `{service}` is replaced with the service name
    pub stop_command: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Project collection the build belongs to, for log context only
    pub collection_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Also append log output to this file
    pub file: Option<PathBuf>,
}

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub collection_url: Option<String>,
    pub sdk_dir: Option<PathBuf>,
    pub packages_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub database_backup_file: Option<PathBuf>,
    pub service_name: Option<String>,
    pub restore_all_files: bool,
    pub overwrite_backup: bool,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            packages_dir: None,
            sdk_dir: None,
            backup_dir: None,
            backup_candidates: default_backup_candidates(),
            log_dir: None,
            settings_file: default_settings_file(),
        }
    }
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            descriptor_dir: "Descriptor".to_string(),
            descriptor_extension: "xml".to_string(),
            customization_marker: "BuildCustomization.txt".to_string(),
            metadata_file: "MetadataLocation.xml".to_string(),
            manifest_file: "BackupComplete.json".to_string(),
            restore_all_files: false,
            overwrite_backup: false,
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            program: "robocopy".to_string(),
            retry_count: 3,
            retry_wait_secs: 5,
            threads: Some(16),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            script: None,
            interpreter: None,
            name: "AxDB".to_string(),
            server: "localhost".to_string(),
            backup_file: None,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            stop_command: default_stop_command(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// Default values
fn default_backup_candidates() -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![PathBuf::from(r"D:\BuildBackup"), PathBuf::from(r"C:\BuildBackup")]
    } else {
        vec![
            PathBuf::from("/mnt/buildprep-backup"),
            PathBuf::from("/var/backups/buildprep"),
        ]
    }
}

fn default_settings_file() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\ProgramData\buildprep-agent\settings.toml")
    } else {
        PathBuf::from("/var/lib/buildprep-agent/settings.toml")
    }
}

fn default_stop_command() -> Vec<String> {
    if cfg!(windows) {
        vec!["net".to_string(), "stop".to_string(), "{service}".to_string()]
    } else {
        vec!["systemctl".to_string(), "stop".to_string(), "{service}".to_string()]
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Fold command-line values into the loaded configuration.
    pub fn apply_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.collection_url.is_some() {
            self.run.collection_url = overrides.collection_url;
        }
        if overrides.sdk_dir.is_some() {
            self.paths.sdk_dir = overrides.sdk_dir;
        }
        if overrides.packages_dir.is_some() {
            self.paths.packages_dir = overrides.packages_dir;
        }
        if overrides.backup_dir.is_some() {
            self.paths.backup_dir = overrides.backup_dir;
        }
        if overrides.database_backup_file.is_some() {
            self.database.backup_file = overrides.database_backup_file;
        }
        if overrides.service_name.is_some() {
            self.service.name = overrides.service_name;
        }
        if overrides.log_file.is_some() {
            self.log.file = overrides.log_file;
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
        // Switches can only turn behavior on.
        self.packages.restore_all_files |= overrides.restore_all_files;
        self.packages.overwrite_backup |= overrides.overwrite_backup;
        self
    }

    /// Directory for mirror log artifacts
    pub fn log_dir(&self) -> PathBuf {
        self.paths
            .log_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("buildprep-logs"))
    }

    /// Database script path, resolved against the SDK root when relative
    pub fn database_script(&self) -> Option<PathBuf> {
        let script = self.database.script.as_ref()?;
        match &self.paths.sdk_dir {
            Some(sdk) if script.is_relative() => Some(sdk.join(script)),
            _ => Some(script.clone()),
        }
    }
}
