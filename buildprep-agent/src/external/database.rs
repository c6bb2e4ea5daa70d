//! Database backup/restore through an external script.
//!
//! The script is opaque: it receives a mode, a backup file path, the database
//! name and server, and reports pass/fail through its exit status.

use crate::config::DatabaseConfig;
use crate::location::BackupRoot;
use crate::utils::errors::{PrepError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseMode {
    Backup,
    Restore,
}

impl DatabaseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseMode::Backup => "backup",
            DatabaseMode::Restore => "restore",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInvocation {
    pub backup_file: PathBuf,
    pub database: String,
    pub server: String,
    pub mode: DatabaseMode,
}

#[async_trait]
pub trait DatabaseScript: Send + Sync {
    async fn invoke(&self, invocation: &DatabaseInvocation) -> Result<()>;
}

/// Runs `[interpreter] <script> <mode> <backup_file> <database> <server>`.
pub struct CommandDatabaseScript {
    interpreter: Option<String>,
    script: PathBuf,
}

impl CommandDatabaseScript {
    pub fn new(interpreter: Option<String>, script: PathBuf) -> Self {
        Self { interpreter, script }
    }

    fn command(&self, invocation: &DatabaseInvocation) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.script);
                cmd
            }
            None => Command::new(&self.script),
        };
        cmd.arg(invocation.mode.as_str())
            .arg(&invocation.backup_file)
            .arg(&invocation.database)
            .arg(&invocation.server);
        cmd
    }
}

#[async_trait]
impl DatabaseScript for CommandDatabaseScript {
    async fn invoke(&self, invocation: &DatabaseInvocation) -> Result<()> {
        info!(
            script = %self.script.display(),
            mode = invocation.mode.as_str(),
            database = %invocation.database,
            server = %invocation.server,
            file = %invocation.backup_file.display(),
            "[DB] Running database script"
        );

        let output = self
            .command(invocation)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PrepError::DatabaseScript(format!("failed to start {}: {}", self.script.display(), e)))?;

        if !output.status.success() {
            return Err(PrepError::DatabaseScript(format!(
                "{} {} exited with {}: {}",
                self.script.display(),
                invocation.mode.as_str(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseOutcome {
    /// No script configured
    NotConfigured,
    /// A backup file was already present
    AlreadyBackedUp(PathBuf),
    BackedUp(PathBuf),
    Restored(PathBuf),
}

/// `<root>/<database>.bak`
pub fn backup_file_path(root: &BackupRoot, database: &str) -> PathBuf {
    root.path.join(format!("{}.bak", database))
}

/// Back the database up into `root` unless a backup file already exists.
pub async fn backup_database(
    script: &dyn DatabaseScript,
    root: &BackupRoot,
    config: &DatabaseConfig,
) -> Result<DatabaseOutcome> {
    let file = backup_file_path(root, &config.name);
    if file.is_file() {
        info!(file = %file.display(), "[DB] Database backup already exists, skipping");
        return Ok(DatabaseOutcome::AlreadyBackedUp(file));
    }

    script
        .invoke(&DatabaseInvocation {
            backup_file: file.clone(),
            database: config.name.clone(),
            server: config.server.clone(),
            mode: DatabaseMode::Backup,
        })
        .await?;

    if !file.is_file() {
        return Err(PrepError::DatabaseScript(format!(
            "script reported success but {} was not created",
            file.display()
        )));
    }

    info!(file = %file.display(), "[DB] Database backup created");
    Ok(DatabaseOutcome::BackedUp(file))
}

/// Restore the database from an explicitly supplied backup file.
pub async fn restore_database(
    script: &dyn DatabaseScript,
    file: &Path,
    config: &DatabaseConfig,
) -> Result<DatabaseOutcome> {
    if !file.is_file() {
        return Err(PrepError::BackupMissing {
            path: file.to_path_buf(),
        });
    }

    script
        .invoke(&DatabaseInvocation {
            backup_file: file.to_path_buf(),
            database: config.name.clone(),
            server: config.server.clone(),
            mode: DatabaseMode::Restore,
        })
        .await?;

    info!(file = %file.display(), database = %config.name, "[DB] Database restored");
    Ok(DatabaseOutcome::Restored(file.to_path_buf()))
}
