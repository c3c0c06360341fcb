//! Archive extraction after a completed copy.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use seedferry_config::ToolSettings;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{FsOpsError, FsOpsResult};
use crate::process::{CommandSpec, ProcessExit, StreamSource, run_streaming};

/// List `.rar` files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns an error when the directory cannot be read.
pub fn find_archives(dir: &Path) -> FsOpsResult<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).map_err(|err| FsOpsError::io("find_archives.read_dir", dir, err))?;
    let mut archives: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_rar(path))
        .collect();
    archives.sort();
    Ok(archives)
}

/// Whether `path` names a `.rar` archive, ignoring case.
#[must_use]
pub fn is_rar(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("rar"))
}

/// Outcome for one archive.
#[derive(Debug)]
pub struct ArchiveOutcome {
    /// Archive that was processed.
    pub archive: PathBuf,
    /// Exit status, or the reason the extractor could not finish.
    pub result: FsOpsResult<ProcessExit>,
}

impl ArchiveOutcome {
    /// Whether the extractor exited with status zero.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(exit) if exit.success())
    }
}

/// How archive members are laid out in the target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLayout {
    /// Every member lands directly in the target directory (`e`).
    Flatten,
    /// Members keep their stored paths below the target directory (`x`).
    KeepPaths,
}

impl ArchiveLayout {
    const fn verb(self) -> &'static str {
        match self {
            Self::Flatten => "e",
            Self::KeepPaths => "x",
        }
    }
}

/// Runs the extraction executable.
#[derive(Debug, Clone)]
pub struct Extractor {
    program: String,
    timeout: Option<Duration>,
}

impl Extractor {
    /// Extractor configured from the tool settings.
    #[must_use]
    pub fn new(tools: &ToolSettings) -> Self {
        Self {
            program: tools.extract_program.clone(),
            timeout: tools.extract_timeout,
        }
    }

    /// Argument vector extracting `archive` into `into`.
    #[must_use]
    pub fn command(&self, archive: &Path, into: &Path, layout: ArchiveLayout) -> CommandSpec {
        CommandSpec::new(self.program.clone())
            .arg(layout.verb())
            .arg(archive)
            .arg(into)
            .timeout(self.timeout)
    }

    /// Extract a single archive into `into`.
    ///
    /// # Errors
    ///
    /// Returns an error when the program cannot be started, the deadline
    /// elapses, or `cancel` fires.
    pub async fn extract(
        &self,
        archive: &Path,
        into: &Path,
        layout: ArchiveLayout,
        cancel: &CancellationToken,
    ) -> FsOpsResult<ProcessExit> {
        let spec = self.command(archive, into, layout);
        run_streaming(&spec, cancel, |line| match line.source {
            StreamSource::Stdout => debug!(output = %line.text, "extract output"),
            StreamSource::Stderr => error!(output = %line.text, "extract error output"),
        })
        .await
    }

    /// Extract every archive found directly inside `dir` into `dir`, flattened.
    ///
    /// Failures are logged per archive and never stop the remaining ones;
    /// only cancellation ends the loop early.
    ///
    /// # Errors
    ///
    /// Returns an error when `dir` cannot be listed.
    pub async fn extract_all(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> FsOpsResult<Vec<ArchiveOutcome>> {
        let archives = find_archives(dir)?;
        if archives.is_empty() {
            debug!(dir = %dir.display(), "no archives to extract");
        }

        let mut outcomes = Vec::with_capacity(archives.len());
        for archive in archives {
            let result = self.extract(&archive, dir, ArchiveLayout::Flatten, cancel).await;
            let cancelled = matches!(&result, Err(err) if err.is_cancelled());
            let outcome = ArchiveOutcome { archive, result };
            log_outcome(
                &outcome,
                &self.command(&outcome.archive, dir, ArchiveLayout::Flatten),
            );
            outcomes.push(outcome);
            if cancelled {
                break;
            }
        }
        Ok(outcomes)
    }
}

fn log_outcome(outcome: &ArchiveOutcome, spec: &CommandSpec) {
    let archive = outcome.archive.display();
    match &outcome.result {
        Ok(exit) if exit.success() => info!(archive = %archive, "archive extracted"),
        Ok(exit) => error!(
            archive = %archive,
            code = ?exit.code,
            command = %spec.display(),
            "archive extraction failed"
        ),
        Err(err) => error!(
            archive = %archive,
            error = %err,
            command = %spec.display(),
            "archive extraction failed"
        ),
    }
}
