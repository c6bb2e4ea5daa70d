//! Directory traversal producing file-count and byte totals.
//!
//! Backup verification never trusts the mirror tool's own summary; every
//! total is recomputed here by walking the tree.

use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Aggregate of a scanned tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSummary {
    /// Number of regular files
    pub files: usize,

    /// Sum of regular file sizes in bytes
    pub bytes: u64,
}

/// Names to leave out of a scan. Matching is by exact entry name, ignoring
/// ASCII case, the same way the mirror tool applies its exclusions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanFilter<'a> {
    pub excluded_files: &'a [String],
    pub excluded_dirs: &'a [String],
}

impl ScanFilter<'_> {
    fn skips_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0 && matches_any(entry, self.excluded_dirs)
    }

    fn skips_file(&self, entry: &DirEntry) -> bool {
        matches_any(entry, self.excluded_files)
    }
}

/// Walk `root` and total every regular file.
///
/// A missing root is an empty tree, not an error. Symbolic links are not
/// followed.
///
/// # Example
/// ```no_run
/// use buildprep_agent::fs::walker::{scan_tree, ScanFilter};
/// use std::path::Path;
///
/// let summary = scan_tree(Path::new("/deploy/packages"), ScanFilter::default()).unwrap();
/// println!("{} files, {} bytes", summary.files, summary.bytes);
/// ```
pub fn scan_tree(root: &Path, filter: ScanFilter<'_>) -> std::io::Result<TreeSummary> {
    let mut summary = TreeSummary::default();

    if !root.exists() {
        return Ok(summary);
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && filter.skips_dir(e)));

    for entry in walker {
        let entry = entry?;

        if !entry.file_type().is_file() || filter.skips_file(&entry) {
            continue;
        }

        summary.files += 1;
        summary.bytes += entry.metadata()?.len();
    }

    Ok(summary)
}

/// Walk `root` without any exclusions.
pub fn scan_all(root: &Path) -> std::io::Result<TreeSummary> {
    scan_tree(root, ScanFilter::default())
}

/// True when `root` does not exist or has no entries at all.
pub fn is_empty_dir(root: &Path) -> std::io::Result<bool> {
    match std::fs::read_dir(root) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

fn matches_any(entry: &DirEntry, names: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    names.iter().any(|n| n.eq_ignore_ascii_case(&file_name))
}
