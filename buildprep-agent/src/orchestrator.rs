//! One build-prep run.
//!
//! Phases run strictly in sequence: stop the deployment service, back up or
//! restore the packages, then back up or restore the database. A failed phase
//! ends the run.

use crate::config::Config;
use crate::external::database::{self, DatabaseOutcome, DatabaseScript};
use crate::external::service::ServiceControl;
use crate::location::{BackupPathResolver, BackupPurpose};
use crate::mirror::log::RestoreStatus;
use crate::mirror::MirrorTool;
use crate::packages::{PackageBackupManager, PackageRestoreManager};
use crate::settings::SettingsStore;
use crate::utils::errors::{PrepError, Result};
use crate::utils::format::format_duration;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// What the package phase did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagePhase {
    /// A fresh baseline was taken; the deployment already matches it.
    BackedUp,
    /// The existing baseline was mirrored back onto the deployment.
    Restored(RestoreStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub service_stopped: bool,
    pub packages: PackagePhase,
    pub database: DatabaseOutcome,
}

pub struct Orchestrator<'a> {
    config: &'a Config,
    settings: SettingsStore,
    mirror: &'a dyn MirrorTool,
    service: &'a dyn ServiceControl,
    database: Option<&'a dyn DatabaseScript>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        settings: SettingsStore,
        mirror: &'a dyn MirrorTool,
        service: &'a dyn ServiceControl,
        database: Option<&'a dyn DatabaseScript>,
    ) -> Self {
        Self {
            config,
            settings,
            mirror,
            service,
            database,
        }
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        let start_time = Instant::now();

        // Configuration errors surface before anything is stopped or written.
        let packages_dir = self
            .config
            .paths
            .packages_dir
            .clone()
            .ok_or(PrepError::PackagesPathUnresolved)?;

        let service_stopped = self.stop_service().await?;
        let packages = self.prepare_packages(&packages_dir).await?;
        let database = self.prepare_database().await?;

        info!(
            service_stopped,
            packages = ?packages,
            database = ?database,
            elapsed = %format_duration(start_time.elapsed().as_secs()),
            "Build preparation finished"
        );

        Ok(RunSummary {
            service_stopped,
            packages,
            database,
        })
    }

    async fn stop_service(&self) -> Result<bool> {
        match self.config.service.name.as_deref() {
            Some(name) if !name.is_empty() => {
                self.service.stop(name).await?;
                Ok(true)
            }
            _ => {
                info!("No deployment service configured, skipping stop");
                Ok(false)
            }
        }
    }

    async fn prepare_packages(&mut self, packages_dir: &Path) -> Result<PackagePhase> {
        let root = BackupPathResolver::from_config(self.config)
            .resolve(BackupPurpose::Packages, &mut self.settings)
            .await?;

        let outcome = PackageBackupManager::new(self.config, self.mirror)
            .backup(&root, packages_dir, self.config.packages.overwrite_backup)
            .await?;

        if outcome.created {
            info!("Fresh package backup taken, deployment is already at baseline; skipping restore");
            return Ok(PackagePhase::BackedUp);
        }

        let result = PackageRestoreManager::new(self.config, self.mirror)
            .restore(&root, packages_dir, self.config.packages.restore_all_files)
            .await?;
        Ok(PackagePhase::Restored(result.status()))
    }

    async fn prepare_database(&mut self) -> Result<DatabaseOutcome> {
        let Some(script) = self.database else {
            info!("No database script configured, skipping database phase");
            return Ok(DatabaseOutcome::NotConfigured);
        };

        match self.config.database.backup_file.as_deref() {
            Some(file) => database::restore_database(script, file, &self.config.database).await,
            None => {
                let root = BackupPathResolver::from_config(self.config)
                    .resolve(BackupPurpose::Databases, &mut self.settings)
                    .await?;
                database::backup_database(script, &root, &self.config.database).await
            }
        }
    }
}
