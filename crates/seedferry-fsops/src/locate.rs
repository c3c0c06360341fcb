//! Search a root for data that the local instance can no longer find.
//!
//! # Design
//! - The walk is read-only and sorted by file name so the first hit is stable.
//! - "Not found" is a normal outcome, reported as `None`.
//! - Unreadable entries are skipped rather than aborting the search.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recursive basename search under a fixed root.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    root: PathBuf,
}

impl LocationResolver {
    /// Resolver searching beneath `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root searched by this resolver.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the directory a torrent's file hangs from.
    ///
    /// `relative_file` is the file path as listed by the torrent (for example
    /// `Show/S01/episode.mkv`). The first file under the root whose basename
    /// matches is taken; when its path ends with the full relative path those
    /// components are stripped, otherwise its containing directory is returned.
    #[must_use]
    pub fn resolve(&self, relative_file: &str) -> Option<PathBuf> {
        let relative = Path::new(relative_file);
        let basename = relative.file_name()?;

        let found = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry during search");
                    None
                }
            })
            .find(|entry| entry.file_type().is_file() && entry.file_name() == basename)?;

        let found = found.into_path();
        let location = strip_relative(&found, relative).or_else(|| found.parent().map(Path::to_path_buf));
        debug!(
            file = %relative_file,
            found = %found.display(),
            "located torrent data"
        );
        location
    }

    /// Run [`Self::resolve`] on the blocking pool.
    pub async fn resolve_blocking(&self, relative_file: &str) -> Option<PathBuf> {
        let resolver = self.clone();
        let relative_file = relative_file.to_string();
        match tokio::task::spawn_blocking(move || resolver.resolve(&relative_file)).await {
            Ok(location) => location,
            Err(err) => {
                warn!(error = %err, "location search task failed");
                None
            }
        }
    }
}

fn strip_relative(found: &Path, relative: &Path) -> Option<PathBuf> {
    let depth = relative
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .count();
    if depth < 2 || !found.ends_with(relative) {
        return None;
    }
    found.ancestors().nth(depth).map(Path::to_path_buf)
}
