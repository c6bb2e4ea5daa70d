//! In-process mirror used by tests.
//!
//! Copies the source tree honoring exclusions, purges extras when deletions
//! are requested, and writes a log artifact made of scripted lines.

use super::{MirrorOutcome, MirrorRequest, MirrorTool};
use crate::packages::exclusions::ExclusionSet;
use crate::utils::errors::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::{DirEntry, WalkDir};

#[derive(Default)]
pub(crate) struct FakeMirror {
    exit_code: i32,
    log_lines: Vec<String>,
    drop_after_copy: Option<PathBuf>,
    skip_copy: bool,
    requests: Mutex<Vec<MirrorRequest>>,
}

impl FakeMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_log_line(mut self, line: impl Into<String>) -> Self {
        self.log_lines.push(line.into());
        self
    }

    /// Remove this destination-relative file once copying is done.
    pub fn dropping(mut self, relative: impl Into<PathBuf>) -> Self {
        self.drop_after_copy = Some(relative.into());
        self
    }

    /// Report the configured exit code without touching any file.
    pub fn without_copy(mut self) -> Self {
        self.skip_copy = true;
        self
    }

    pub fn requests(&self) -> Vec<MirrorRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl MirrorTool for FakeMirror {
    async fn run(&self, request: &MirrorRequest) -> Result<MirrorOutcome> {
        self.requests.lock().unwrap().push(request.clone());

        if !self.skip_copy {
            copy_tree(&request.source, &request.destination, &request.exclusions)?;
            if request.mirror_deletions {
                purge_extras(&request.source, &request.destination, &request.exclusions)?;
            }
            if let Some(relative) = &self.drop_after_copy {
                fs::remove_file(request.destination.join(relative))?;
            }
        }

        fs::write(&request.log_path, self.log_lines.join("\n"))?;

        Ok(MirrorOutcome {
            exit_code: self.exit_code,
            log_lines: self.log_lines.clone(),
        })
    }
}

fn excluded(entry: &DirEntry, exclusions: &ExclusionSet) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        exclusions.contains_dir(&name)
    } else {
        exclusions.contains_file(&name)
    }
}

fn copy_tree(source: &Path, destination: &Path, exclusions: &ExclusionSet) -> std::io::Result<()> {
    fs::create_dir_all(destination)?;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !excluded(e, exclusions));

    for entry in walker {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

fn purge_extras(source: &Path, destination: &Path, exclusions: &ExclusionSet) -> std::io::Result<()> {
    let mut extras = Vec::new();

    let walker = WalkDir::new(destination)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !excluded(e, exclusions));

    for entry in walker {
        let entry = entry?;
        let relative = entry.path().strip_prefix(destination).unwrap_or(entry.path());
        if !source.join(relative).exists() {
            extras.push((entry.path().to_path_buf(), entry.file_type().is_dir()));
        }
    }

    for (path, is_dir) in extras {
        if !path.exists() {
            continue;
        }
        if is_dir {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    Ok(())
}
