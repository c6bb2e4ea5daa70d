//! Selective restore of the baseline backup onto the live deployment.

use super::classify::classify_children;
use super::exclusions;
use super::manifest::BackupManifest;
use crate::config::Config;
use crate::location::BackupRoot;
use crate::mirror::log::{analyze, VerificationResult};
use crate::mirror::{self, log_artifact_path, MirrorRequest, MirrorTool};
use crate::utils::errors::{PrepError, Result};
use crate::utils::format::format_bytes;
use std::path::Path;
use tracing::{info, warn};

pub struct PackageRestoreManager<'a> {
    config: &'a Config,
    mirror: &'a dyn MirrorTool,
}

impl<'a> PackageRestoreManager<'a> {
    pub fn new(config: &'a Config, mirror: &'a dyn MirrorTool) -> Self {
        Self { config, mirror }
    }

    /// Mirror the backup at `root` onto `destination`.
    ///
    /// Mirror exit codes in the benign range never fail the restore; problems
    /// found in its log are returned as warnings.
    pub async fn restore(
        &self,
        root: &BackupRoot,
        destination: &Path,
        restore_all_files: bool,
    ) -> Result<VerificationResult> {
        let rules = &self.config.packages;

        if !root.path.is_dir() || !BackupManifest::exists_in(&root.path, &rules.manifest_file) {
            return Err(PrepError::BackupMissing {
                path: root.path.clone(),
            });
        }

        // The mirror tool logs absolute paths; analysis maps them back by prefix.
        let backup_path = std::path::absolute(&root.path)?;
        let deployment = std::path::absolute(destination)?;
        let destination = deployment.as_path();

        let backup_children = classify_children(&backup_path, rules)?;
        let deployment_children = classify_children(destination, rules)?;
        let exclusions = exclusions::plan(&backup_children, &deployment_children, restore_all_files, rules);

        if !restore_all_files {
            for child in deployment_children.iter().filter(|c| !c.is_package() && c.is_customized()) {
                if !backup_children.iter().any(|b| b.name.eq_ignore_ascii_case(&child.name)) {
                    warn!(dir = %child.path.display(), "Customized directory is not in the backup and will be purged");
                }
            }
        }

        info!(
            backup = %backup_path.display(),
            destination = %destination.display(),
            restore_all_files,
            excluded_files = ?exclusions.files,
            excluded_dirs = ?exclusions.dirs,
            "Restoring packages"
        );

        let request = MirrorRequest::new(
            &backup_path,
            destination,
            &self.config.mirror,
            log_artifact_path(&self.config.log_dir(), root.purpose.as_str(), "Restore"),
        )
        .excluding(exclusions);
        let report = mirror::sync(self.mirror, &request).await?;

        if !report.is_benign() {
            return Err(PrepError::RestoreFailed {
                destination: destination.to_path_buf(),
                exit_code: report.exit_code,
                log_path: report.log_path,
            });
        }

        let result = analyze(&report.log_lines, destination, &backup_path);

        if result.passed() {
            info!(
                files = report.destination.files,
                size = %format_bytes(report.destination.bytes),
                exit_code = report.exit_code,
                benign = result.benign_problems(),
                "Package restore completed"
            );
        } else {
            warn!(
                files = report.destination.files,
                exit_code = report.exit_code,
                problems = result.real_problems(),
                benign = result.benign_problems(),
                log = %report.log_path.display(),
                "Package restore completed with warnings"
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::walker::{scan_all, TreeSummary};
    use crate::location::BackupPurpose;
    use crate::mirror::fake::FakeMirror;
    use crate::mirror::log::{ProblemKind, RestoreStatus};
    use crate::packages::backup::PackageBackupManager;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        config: Config,
        deploy: PathBuf,
        root: BackupRoot,
    }

    /// Deployment with a package `Ledger` and a foreign `Temp`, already backed up.
    async fn backed_up() -> Result<Fixture> {
        let temp = TempDir::new()?;
        let deploy = temp.path().join("deploy");
        fs::create_dir_all(deploy.join("Ledger/Descriptor"))?;
        fs::write(deploy.join("Ledger/Descriptor/Ledger.xml"), b"<d/>")?;
        fs::write(deploy.join("Ledger/a.dll"), b"original")?;
        fs::create_dir_all(deploy.join("Temp"))?;
        fs::write(deploy.join("Temp/cache.bin"), b"cache-v1")?;

        let mut config = Config::default();
        config.paths.log_dir = Some(temp.path().join("logs"));
        let root = BackupRoot {
            path: temp.path().join("backup/Packages"),
            purpose: BackupPurpose::Packages,
        };

        let mirror = FakeMirror::new();
        PackageBackupManager::new(&config, &mirror)
            .backup(&root, &deploy, false)
            .await?;

        Ok(Fixture {
            _temp: temp,
            config,
            deploy,
            root,
        })
    }

    #[tokio::test]
    async fn test_missing_backup() -> Result<()> {
        let temp = TempDir::new()?;
        let config = Config::default();
        let mirror = FakeMirror::new();
        let root = BackupRoot {
            path: temp.path().join("nothing"),
            purpose: BackupPurpose::Packages,
        };

        let err = PackageRestoreManager::new(&config, &mirror)
            .restore(&root, temp.path(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PrepError::BackupMissing { .. }));
        assert_eq!(mirror.call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_safe_restore_leaves_foreign_content() -> Result<()> {
        let f = backed_up().await?;

        // Build and developer activity after the baseline.
        fs::write(f.deploy.join("Ledger/a.dll"), b"rebuilt")?;
        fs::write(f.deploy.join("Ledger/extra.dll"), b"stale")?;
        fs::write(f.deploy.join("Temp/cache.bin"), b"cache-v2")?;
        fs::create_dir_all(f.deploy.join("Scratch"))?;
        fs::write(f.deploy.join("Scratch/notes.txt"), b"n")?;

        let mirror = FakeMirror::new();
        let result = PackageRestoreManager::new(&f.config, &mirror)
            .restore(&f.root, &f.deploy, false)
            .await?;

        assert!(result.passed());
        let request = &mirror.requests()[0];
        assert_eq!(request.exclusions.dirs, vec!["Temp".to_string(), "Scratch".to_string()]);
        assert!(request.exclusions.contains_file("BackupComplete.json"));
        assert!(request.exclusions.contains_file("MetadataLocation.xml"));

        // Package content back at baseline.
        assert_eq!(fs::read(f.deploy.join("Ledger/a.dll"))?, b"original");
        assert!(!f.deploy.join("Ledger/extra.dll").exists());
        // Foreign content untouched.
        assert_eq!(fs::read(f.deploy.join("Temp/cache.bin"))?, b"cache-v2");
        assert!(f.deploy.join("Scratch/notes.txt").exists());
        assert!(!f.deploy.join("BackupComplete.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_customized_dir_is_purged_by_mirror() -> Result<()> {
        // A customized non-package directory absent from the backup is not
        // excluded, so the mirror makes it match the backup.
        let f = backed_up().await?;
        fs::create_dir_all(f.deploy.join("Hotfix"))?;
        fs::write(f.deploy.join("Hotfix/BuildCustomization.txt"), b"")?;

        let mirror = FakeMirror::new();
        PackageRestoreManager::new(&f.config, &mirror)
            .restore(&f.root, &f.deploy, false)
            .await?;

        assert!(!mirror.requests()[0].exclusions.contains_dir("Hotfix"));
        assert!(!f.deploy.join("Hotfix").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_full_restore_round_trip() -> Result<()> {
        let f = backed_up().await?;
        let expected = scan_all(&f.deploy)?;
        let empty = f._temp.path().join("fresh");

        let mirror = FakeMirror::new();
        let result = PackageRestoreManager::new(&f.config, &mirror)
            .restore(&f.root, &empty, true)
            .await?;

        assert!(result.passed());
        assert_eq!(scan_all(&empty)?, expected);
        assert_eq!(expected, TreeSummary { files: 3, bytes: 20 });
        assert_eq!(mirror.requests()[0].exclusions.files, vec!["BackupComplete.json".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_stuck_file_is_warning_not_failure() -> Result<()> {
        let f = backed_up().await?;
        fs::create_dir_all(f.deploy.join("Foo/Descriptor"))?;
        fs::write(f.deploy.join("Foo/Descriptor/Foo.xml"), b"<d/>")?;
        fs::create_dir_all(f.deploy.join("Foo/bin"))?;
        let stuck = f.deploy.join("Foo/bin/x.runtime");

        // Tool reports the delete failed and leaves the file behind.
        let mirror = FakeMirror::new()
            .without_copy()
            .with_exit_code(3)
            .with_log_line(format!(
                "2024/05/01 10:00:00 ERROR 5 (0x00000005) Deleting Extra File {}",
                stuck.display()
            ));
        fs::write(&stuck, b"locked")?;

        let result = PackageRestoreManager::new(&f.config, &mirror)
            .restore(&f.root, &f.deploy, false)
            .await?;

        assert_eq!(result.real_problems(), 1);
        assert_eq!(result.problems[0].kind, ProblemKind::NotPurged);
        assert_eq!(result.status(), RestoreStatus::SuccessWithWarnings);
        Ok(())
    }

    #[tokio::test]
    async fn test_relative_roots_map_logged_paths() -> Result<()> {
        // Relative to the working directory, as a config file may give them.
        let work = TempDir::new_in(".")?;
        let deploy = work.path().join("deploy");
        fs::create_dir_all(deploy.join("Ledger/Descriptor"))?;
        fs::write(deploy.join("Ledger/Descriptor/Ledger.xml"), b"<d/>")?;
        fs::create_dir_all(deploy.join("Ledger/bin"))?;

        let mut config = Config::default();
        config.paths.log_dir = Some(work.path().join("logs"));
        let root = BackupRoot {
            path: work.path().join("backup/Packages"),
            purpose: BackupPurpose::Packages,
        };
        PackageBackupManager::new(&config, &FakeMirror::new())
            .backup(&root, &deploy, false)
            .await?;
        assert!(deploy.is_relative());

        let stuck = deploy.join("Ledger/bin/x.runtime");
        fs::write(&stuck, b"locked")?;
        let gone = deploy.join("Ledger/bin/old.runtime");
        let mirror = FakeMirror::new()
            .without_copy()
            .with_exit_code(3)
            .with_log_line(format!(
                "ERROR 5 (0x00000005) Deleting Extra File {}",
                std::path::absolute(&stuck)?.display()
            ))
            .with_log_line(format!(
                "ERROR 32 (0x00000020) Deleting Extra File {}",
                std::path::absolute(&gone)?.display()
            ));

        let result = PackageRestoreManager::new(&config, &mirror)
            .restore(&root, &deploy, false)
            .await?;

        let kinds: Vec<_> = result.problems.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ProblemKind::NotPurged, ProblemKind::Purged]);
        assert!(mirror.requests()[0].destination.is_absolute());
        Ok(())
    }

    #[tokio::test]
    async fn test_error_exit_code_fails_restore() -> Result<()> {
        let f = backed_up().await?;
        let mirror = FakeMirror::new().without_copy().with_exit_code(8);

        let err = PackageRestoreManager::new(&f.config, &mirror)
            .restore(&f.root, &f.deploy, false)
            .await
            .unwrap_err();
        assert!(matches!(err, PrepError::RestoreFailed { exit_code: 8, .. }));
        Ok(())
    }
}
