//! Exclusion planning for restore mirrors.
//!
//! A mirror with deletions enabled would wipe anything in the deployment that
//! is not in the backup. The planner names every file and directory the mirror
//! must leave alone: the manifest always, and in safe mode the metadata-location
//! file plus every directory the build pipeline did not produce.

use super::classify::PackageDirectory;
use crate::config::PackagesConfig;

/// File and directory names handed to one mirror invocation.
///
/// Both lists keep insertion order and never hold the same name twice
/// (compared ignoring ASCII case).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

impl ExclusionSet {
    pub fn add_file(&mut self, name: &str) {
        push_unique(&mut self.files, name);
    }

    pub fn add_dir(&mut self, name: &str) {
        push_unique(&mut self.dirs, name);
    }

    pub fn contains_dir(&self, name: &str) -> bool {
        self.dirs.iter().any(|d| d.eq_ignore_ascii_case(name))
    }

    pub fn contains_file(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Append `other`'s names after this set's.
    pub fn union(mut self, other: &ExclusionSet) -> Self {
        for file in &other.files {
            self.add_file(file);
        }
        for dir in &other.dirs {
            self.add_dir(dir);
        }
        self
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        list.push(name.to_string());
    }
}

/// Backup-side exclusions: every child the backup holds that is not a package.
pub fn backup_side(children: &[PackageDirectory]) -> ExclusionSet {
    let mut set = ExclusionSet::default();
    for child in children.iter().filter(|c| !c.is_package()) {
        set.add_dir(&child.name);
    }
    set
}

/// Deployment-side exclusions: children that are neither packages nor
/// customized, and not already excluded by the backup side.
pub fn deployment_side(children: &[PackageDirectory], backup_excluded: &ExclusionSet) -> ExclusionSet {
    let mut set = ExclusionSet::default();
    for child in children {
        if child.is_package() || child.is_customized() || backup_excluded.contains_dir(&child.name) {
            continue;
        }
        set.add_dir(&child.name);
    }
    set
}

/// Build the exclusion set for restoring `backup_children` over
/// `deployment_children`.
pub fn plan(
    backup_children: &[PackageDirectory],
    deployment_children: &[PackageDirectory],
    restore_all_files: bool,
    rules: &PackagesConfig,
) -> ExclusionSet {
    let mut set = ExclusionSet::default();
    set.add_file(&rules.manifest_file);

    if restore_all_files {
        return set;
    }

    set.add_file(&rules.metadata_file);

    let backup = backup_side(backup_children);
    let deployment = deployment_side(deployment_children, &backup);
    set.union(&backup).union(&deployment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::classify::Classification;
    use std::path::PathBuf;

    fn dir(name: &str, is_package: bool, is_customized: bool) -> PackageDirectory {
        PackageDirectory {
            name: name.to_string(),
            path: PathBuf::from(name),
            classification: Classification {
                is_package,
                is_customized,
            },
        }
    }

    #[test]
    fn test_safe_mode_excludes_foreign_backup_dirs() {
        let rules = PackagesConfig::default();
        let backup = vec![dir("Ledger", true, false), dir("Temp", false, false)];
        let deployment = vec![dir("Ledger", true, false), dir("Temp", false, false)];

        let set = plan(&backup, &deployment, false, &rules);

        assert_eq!(set.dirs, vec!["Temp".to_string()]);
        assert_eq!(
            set.files,
            vec!["BackupComplete.json".to_string(), "MetadataLocation.xml".to_string()]
        );
    }

    #[test]
    fn test_customized_deployment_dir_is_not_excluded() {
        let rules = PackagesConfig::default();
        let backup = vec![dir("Ledger", true, false)];
        let deployment = vec![
            dir("Ledger", true, false),
            dir("Hotfix", false, true),
            dir("Scratch", false, false),
        ];

        let set = plan(&backup, &deployment, false, &rules);

        assert!(!set.contains_dir("Hotfix"));
        assert!(set.contains_dir("Scratch"));
    }

    #[test]
    fn test_backup_side_exclusion_wins_over_customization() {
        // Non-package in the backup, later customized in the deployment: the
        // backup-side exclusion still applies.
        let backup = vec![dir("Legacy", false, false)];
        let deployment = vec![dir("Legacy", false, true)];

        let set = plan(&backup, &deployment, false, &PackagesConfig::default());
        assert_eq!(set.dirs, vec!["Legacy".to_string()]);
    }

    #[test]
    fn test_names_are_not_duplicated() {
        let backup = vec![dir("Temp", false, false)];
        let deployment = vec![dir("temp", false, false), dir("Logs", false, false)];

        let set = plan(&backup, &deployment, false, &PackagesConfig::default());
        assert_eq!(set.dirs, vec!["Temp".to_string(), "Logs".to_string()]);
    }

    #[test]
    fn test_restore_all_files_only_excludes_manifest() {
        let backup = vec![dir("Temp", false, false)];
        let deployment = vec![dir("Scratch", false, false)];

        let set = plan(&backup, &deployment, true, &PackagesConfig::default());

        assert!(set.dirs.is_empty());
        assert_eq!(set.files, vec!["BackupComplete.json".to_string()]);
    }

    #[test]
    fn test_every_plain_deployment_dir_is_excluded() {
        let deployment: Vec<_> = (0..5)
            .map(|i| dir(&format!("Foreign{}", i), false, false))
            .collect();

        let set = plan(&[], &deployment, false, &PackagesConfig::default());
        for child in &deployment {
            assert!(set.contains_dir(&child.name));
        }
        assert!(set.contains_file("metadatalocation.xml"));
    }
}
