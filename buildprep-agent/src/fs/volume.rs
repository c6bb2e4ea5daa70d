//! Drive readiness and free-space probing for backup locations.

use std::path::{Component, Path, PathBuf};

/// Result of probing the volume a path lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeStatus {
    /// Volume root exists and reports free space
    Ready { root: PathBuf, available: u64 },

    /// Volume root is missing or does not answer a free-space query
    NotReady { root: PathBuf },

    /// Path has no root (relative or virtual), so it has no volume
    Rootless,
}

impl VolumeStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, VolumeStatus::Ready { .. })
    }
}

/// The directory that stands for the path's drive.
///
/// On Windows this is the prefix plus root (`D:\`). On Unix every path shares
/// `/`, so the first directory below it (`/mnt`, `/data`) plays that role.
pub fn volume_root(path: &Path) -> Option<PathBuf> {
    let mut root = PathBuf::new();
    let mut has_root = false;

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => root.push(prefix.as_os_str()),
            Component::RootDir => {
                root.push(component.as_os_str());
                has_root = true;
                if cfg!(windows) {
                    break;
                }
            }
            Component::Normal(name) if has_root => {
                root.push(name);
                break;
            }
            _ => return None,
        }
    }

    has_root.then_some(root)
}

/// Probe the volume backing `path`.
pub fn probe(path: &Path) -> VolumeStatus {
    let Some(root) = volume_root(path) else {
        return VolumeStatus::Rootless;
    };

    if !root.is_dir() {
        return VolumeStatus::NotReady { root };
    }

    match fs2::available_space(&root) {
        Ok(available) => VolumeStatus::Ready { root, available },
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "Free-space query failed");
            VolumeStatus::NotReady { root }
        }
    }
}

/// Free bytes available to `path`, measured at its nearest existing ancestor.
pub fn available_space(path: &Path) -> std::io::Result<u64> {
    let existing = path
        .ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no existing ancestor for {}", path.display()),
            )
        })?;
    fs2::available_space(existing)
}
