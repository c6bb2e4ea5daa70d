//! Package directory classification.
//!
//! A top-level directory is a package when its descriptor folder holds at
//! least one descriptor document, and customized when the customization marker
//! sits directly inside it. Nothing else (timestamps, sizes) is consulted.

use crate::config::PackagesConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_package: bool,
    pub is_customized: bool,
}

/// A classified child of a packages root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDirectory {
    pub name: String,
    pub path: PathBuf,
    pub classification: Classification,
}

impl PackageDirectory {
    pub fn is_package(&self) -> bool {
        self.classification.is_package
    }

    pub fn is_customized(&self) -> bool {
        self.classification.is_customized
    }
}

/// Classify a single directory.
pub fn classify(dir: &Path, rules: &PackagesConfig) -> std::io::Result<Classification> {
    Ok(Classification {
        is_package: has_descriptor(&dir.join(&rules.descriptor_dir), &rules.descriptor_extension)?,
        is_customized: dir.join(&rules.customization_marker).is_file(),
    })
}

/// Classify every child directory of `root`, sorted by name.
///
/// A missing root yields no children. Plain files at the top level are not
/// package candidates and are skipped.
pub fn classify_children(root: &Path, rules: &PackagesConfig) -> std::io::Result<Vec<PackageDirectory>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut children = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let path = entry.path();
        let classification = classify(&path, rules)?;
        children.push(PackageDirectory {
            name: entry.file_name().to_string_lossy().to_string(),
            path,
            classification,
        });
    }

    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(children)
}

fn has_descriptor(descriptor_dir: &Path, extension: &str) -> std::io::Result<bool> {
    if !descriptor_dir.is_dir() {
        return Ok(false);
    }

    for entry in std::fs::read_dir(descriptor_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches {
            return Ok(true);
        }
    }

    Ok(false)
}
