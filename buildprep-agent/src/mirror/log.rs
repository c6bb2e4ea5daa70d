//! Mirror log analysis.
//!
//! The mirror tool's error lines are advisory: a file it failed to delete may
//! have been deleted on a retry, a file it failed to copy may already be in
//! place. Each reported path is checked on both sides and only inconsistent
//! ones count as real problems.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ERROR_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"ERROR\s+(?P<code>\d+)\s+(?:\(0x[0-9A-Fa-f]+\)\s+)?(?P<message>(?:Deleting|Copying)[^\\/]*?)\s+(?P<path>(?:[A-Za-z]:[\\/]|\\\\|/).*?)\s*$",
    )
    .expect("mirror error regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorAction {
    Purge,
    Copy,
}

/// One error line as logged by the mirror tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLine {
    pub code: u32,
    pub action: MirrorAction,
    pub message: String,
    pub path: String,
}

/// Parse a deletion/copy error line. Other lines yield `None`.
pub fn parse_error_line(line: &str) -> Option<ErrorLine> {
    let caps = ERROR_LINE_RE.captures(line)?;
    let message = caps["message"].trim().to_string();
    let action = if message.starts_with("Deleting") {
        MirrorAction::Purge
    } else {
        MirrorAction::Copy
    };

    Some(ErrorLine {
        code: caps["code"].parse().ok()?,
        action,
        message,
        path: caps["path"].to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// Gone from both sides
    Purged,
    /// Present on both sides
    Restored,
    /// Still in the deployment but not in the backup
    NotPurged,
    /// In the backup but missing from the deployment
    NotRestored,
    /// Path is under neither root
    Unmapped,
}

impl ProblemKind {
    pub fn is_benign(&self) -> bool {
        matches!(self, ProblemKind::Purged | ProblemKind::Restored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemFile {
    pub code: u32,
    pub action: MirrorAction,
    pub message: String,
    pub deployment_path: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,
    pub logged_path: String,
    pub kind: ProblemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    Success,
    SuccessWithWarnings,
}

#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    pub problems: Vec<ProblemFile>,
}

impl VerificationResult {
    pub fn real_problems(&self) -> usize {
        self.problems.iter().filter(|p| !p.kind.is_benign()).count()
    }

    pub fn benign_problems(&self) -> usize {
        self.problems.len() - self.real_problems()
    }

    pub fn passed(&self) -> bool {
        self.real_problems() == 0
    }

    pub fn status(&self) -> RestoreStatus {
        if self.passed() {
            RestoreStatus::Success
        } else {
            RestoreStatus::SuccessWithWarnings
        }
    }
}

/// Classify every error line in `lines`. A path reported more than once
/// (retries) is classified once.
pub fn analyze(lines: &[String], deployment_root: &Path, backup_root: &Path) -> VerificationResult {
    let deployment_key = normalize(&deployment_root.to_string_lossy());
    let backup_key = normalize(&backup_root.to_string_lossy());

    let mut seen = HashSet::new();
    let mut problems = Vec::new();

    for line in lines {
        let Some(error) = parse_error_line(line) else {
            continue;
        };
        if !seen.insert(normalize(&error.path)) {
            continue;
        }

        let mapped = match relative_to(&error.path, &deployment_key) {
            Some(parts) => Some((deployment_root.join(&parts), backup_root.join(&parts))),
            None => relative_to(&error.path, &backup_key)
                .map(|parts| (deployment_root.join(&parts), backup_root.join(&parts))),
        };

        let problem = match mapped {
            Some((deployment_path, backup_path)) => {
                let kind = match (deployment_path.exists(), backup_path.exists()) {
                    (false, false) => ProblemKind::Purged,
                    (true, true) => ProblemKind::Restored,
                    (true, false) => ProblemKind::NotPurged,
                    (false, true) => ProblemKind::NotRestored,
                };
                ProblemFile {
                    code: error.code,
                    action: error.action,
                    message: error.message,
                    deployment_path: Some(deployment_path),
                    backup_path: Some(backup_path),
                    logged_path: error.path,
                    kind,
                }
            }
            None => ProblemFile {
                code: error.code,
                action: error.action,
                message: error.message,
                deployment_path: None,
                backup_path: None,
                logged_path: error.path,
                kind: ProblemKind::Unmapped,
            },
        };

        if problem.kind.is_benign() {
            tracing::debug!(path = %problem.logged_path, kind = ?problem.kind, "Benign mirror error");
        } else {
            tracing::warn!(
                path = %problem.logged_path,
                kind = ?problem.kind,
                code = problem.code,
                "{}",
                problem.message
            );
        }
        problems.push(problem);
    }

    VerificationResult { problems }
}

/// Lowercase (ASCII only, so byte offsets survive) with `/` separators and
/// no trailing separator.
fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_end_matches('/').to_ascii_lowercase()
}

/// Components of `path` below `root_key`, or `None` when outside it.
fn relative_to(path: &str, root_key: &str) -> Option<PathBuf> {
    let normalized = normalize(path);
    let rest = normalized.strip_prefix(root_key)?;
    if !(rest.is_empty() || rest.starts_with('/')) {
        return None;
    }

    // Slice the original to keep its case.
    let original = path.replace('\\', "/");
    let rest = &original[root_key.len()..];
    Some(rest.split('/').filter(|part| !part.is_empty()).collect())
}
