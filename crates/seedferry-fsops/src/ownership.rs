//! Owner-aware, idempotent directory creation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use seedferry_config::Ownership;
use tracing::debug;

use crate::error::{FsOpsError, FsOpsResult};

/// Create `dir` and any missing ancestors, handing each newly created
/// directory to `owner`.
///
/// Directories that already exist, including ones created concurrently by
/// another actor, are left untouched. Returns the directories this call created.
///
/// # Errors
///
/// Returns an error when a directory cannot be created or its ownership
/// cannot be changed.
pub fn ensure_dir_owned(dir: &Path, owner: Ownership) -> FsOpsResult<Vec<PathBuf>> {
    let missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .map(Path::to_path_buf)
        .collect();

    let mut created = Vec::new();
    for path in missing.into_iter().rev() {
        match fs::create_dir(&path) {
            Ok(()) => {
                apply_owner(&path, owner)?;
                created.push(path);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists && path.is_dir() => {}
            Err(err) => return Err(FsOpsError::io("ensure_dir_owned.create", &path, err)),
        }
    }
    if !created.is_empty() {
        debug!(
            dir = %dir.display(),
            created = created.len(),
            owner = %owner.chown_spec(),
            "created destination directories"
        );
    }
    Ok(created)
}

#[cfg(unix)]
fn apply_owner(path: &Path, owner: Ownership) -> FsOpsResult<()> {
    use nix::unistd::{Gid, Uid, chown};

    chown(
        path,
        Some(Uid::from_raw(owner.uid)),
        Some(Gid::from_raw(owner.gid)),
    )
    .map_err(|source| FsOpsError::Nix {
        operation: "ensure_dir_owned.chown",
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(not(unix))]
fn apply_owner(_path: &Path, _owner: Ownership) -> FsOpsResult<()> {
    Err(FsOpsError::Unsupported {
        operation: "ensure_dir_owned.chown",
    })
}
