//! Copy-tool driver: argument vector, output handling and outcome.

use std::ffi::OsString;
use std::path::{MAIN_SEPARATOR, Path};
use std::time::Duration;

use seedferry_config::{Ownership, ProgressSettings, ToolSettings};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::FsOpsResult;
use crate::ownership::ensure_dir_owned;
use crate::process::{CommandSpec, OutputLine, ProcessExit, StreamSource, run_streaming};
use crate::progress::{LineKind, MilestoneTracker, classify};

/// Append a trailing separator when `path` is an existing directory.
///
/// The copy tool copies a directory's contents, not the directory itself,
/// when the source ends with a separator.
#[must_use]
pub fn with_trailing_separator(path: &Path) -> OsString {
    let mut rendered = path.as_os_str().to_os_string();
    let already = path
        .as_os_str()
        .to_string_lossy()
        .ends_with(MAIN_SEPARATOR);
    if path.is_dir() && !already {
        rendered.push(MAIN_SEPARATOR.to_string());
    }
    rendered
}

/// Result of one copy invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Process exit status.
    pub exit: ProcessExit,
    /// Value of the regular-files-transferred stats line, when printed.
    pub files_transferred: Option<u64>,
    /// Milestones logged during the copy, in order.
    pub milestones: Vec<u8>,
    /// Command line, for failure diagnostics.
    pub command: String,
}

impl CopyOutcome {
    /// Whether the copy tool exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit.success()
    }
}

/// Runs the copy executable for one source/destination pair.
#[derive(Debug, Clone)]
pub struct CopyRunner {
    program: String,
    owner: Ownership,
    timeout: Option<Duration>,
    milestones: Vec<u8>,
    tolerance: u8,
}

impl CopyRunner {
    /// Runner configured from the tool and progress settings.
    #[must_use]
    pub fn new(tools: &ToolSettings, progress: &ProgressSettings, owner: Ownership) -> Self {
        Self {
            program: tools.copy_program.clone(),
            owner,
            timeout: tools.transfer_timeout,
            milestones: progress.milestones.clone(),
            tolerance: progress.tolerance,
        }
    }

    /// Owner applied to copied data and created directories.
    #[must_use]
    pub const fn owner(&self) -> Ownership {
        self.owner
    }

    /// Argument vector for copying `source` to `destination`.
    #[must_use]
    pub fn command(&self, source: &Path, destination: &Path) -> CommandSpec {
        CommandSpec::new(self.program.clone())
            .arg("-avP")
            .arg("--progress")
            .arg("--stats")
            .arg(format!("--chown={}", self.owner.chown_spec()))
            .arg(with_trailing_separator(source))
            .arg(with_trailing_separator(destination))
            .timeout(self.timeout)
    }

    /// Copy `source` to `destination`, creating the destination's parent first.
    ///
    /// A non-zero exit is reported through [`CopyOutcome::success`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the parent directory cannot be prepared, the
    /// program cannot be started, the deadline elapses, or `cancel` fires.
    pub async fn copy(
        &self,
        source: &Path,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> FsOpsResult<CopyOutcome> {
        if let Some(parent) = destination.parent() {
            ensure_dir_owned(parent, self.owner)?;
        }
        self.run(self.command(source, destination), cancel).await
    }

    pub(crate) async fn run(
        &self,
        spec: CommandSpec,
        cancel: &CancellationToken,
    ) -> FsOpsResult<CopyOutcome> {
        let mut progress = CopyProgress::new(&self.milestones, self.tolerance);
        let exit = run_streaming(&spec, cancel, |line| progress.handle(&line)).await?;
        Ok(CopyOutcome {
            exit,
            files_transferred: progress.files_transferred,
            milestones: progress.tracker.emitted().to_vec(),
            command: spec.display(),
        })
    }
}

/// Per-copy output state; milestones are shared between both streams.
struct CopyProgress {
    tracker: MilestoneTracker,
    files_transferred: Option<u64>,
}

impl CopyProgress {
    fn new(milestones: &[u8], tolerance: u8) -> Self {
        Self {
            tracker: MilestoneTracker::new(milestones, tolerance),
            files_transferred: None,
        }
    }

    fn handle(&mut self, line: &OutputLine) {
        let output = line.text.as_str();
        match (line.source, classify(output)) {
            (StreamSource::Stdout, LineKind::Noise) => {}
            (StreamSource::Stdout, LineKind::Progress(percent)) => {
                if let Some(milestone) = self.tracker.observe(percent) {
                    info!(milestone, output, "copy progress");
                }
            }
            (StreamSource::Stderr, LineKind::Progress(percent)) => {
                if let Some(milestone) = self.tracker.observe(percent) {
                    error!(milestone, output, "copy progress");
                }
            }
            (StreamSource::Stdout, LineKind::FilesTransferred(count)) => {
                info!(output, "copy output");
                self.files_transferred = Some(count);
                if count == 0 {
                    info!("no files transferred from remote to local");
                }
            }
            (StreamSource::Stdout, LineKind::Message) => info!(output, "copy output"),
            (StreamSource::Stderr, _) => error!(output, "copy error output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn runner(owner: Ownership) -> CopyRunner {
        CopyRunner::new(
            &ToolSettings {
                copy_program: "rsync".into(),
                extract_program: "unrar".into(),
                transfer_timeout: Some(Duration::from_secs(60)),
                extract_timeout: None,
            },
            &ProgressSettings {
                milestones: vec![10, 25, 50, 75, 90],
                tolerance: 2,
            },
            owner,
        )
    }

    #[test]
    fn directories_gain_a_trailing_separator() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let dir = temp.path().join("Show");
        fs::create_dir(&dir)?;
        let file = temp.path().join("film.mkv");
        fs::write(&file, b"x")?;

        let rendered = with_trailing_separator(&dir);
        assert!(rendered.to_string_lossy().ends_with(MAIN_SEPARATOR));
        assert_eq!(with_trailing_separator(&file), file.clone().into_os_string());
        let missing = temp.path().join("absent");
        assert_eq!(with_trailing_separator(&missing), missing.clone().into_os_string());
        Ok(())
    }

    #[test]
    fn command_uses_archive_progress_and_owner_flags() {
        let spec = runner(Ownership { uid: 1001, gid: 100 })
            .command(Path::new("/downloads/tv/ep.mkv"), Path::new("/data/tv/ep.mkv"));
        let args: Vec<String> = spec
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(spec.program, "rsync");
        assert_eq!(
            args,
            vec![
                "-avP",
                "--progress",
                "--stats",
                "--chown=1001:100",
                "/downloads/tv/ep.mkv",
                "/data/tv/ep.mkv",
            ]
        );
        assert_eq!(spec.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn output_handling_tracks_milestones_across_streams() {
        let mut progress = CopyProgress::new(&[10, 25, 50, 75, 90], 2);
        let lines = [
            (StreamSource::Stdout, "sending incremental file list"),
            (StreamSource::Stdout, "ep.mkv"),
            (StreamSource::Stdout, "1,000 9% 1.00MB/s 0:00:10"),
            (StreamSource::Stdout, "2,000 11% 1.00MB/s 0:00:09"),
            (StreamSource::Stderr, "5,000 26% 1.00MB/s 0:00:05"),
            (StreamSource::Stdout, "6,000 49% 1.00MB/s 0:00:04"),
            (StreamSource::Stdout, "Number of regular files transferred: 1"),
        ];
        for (source, text) in lines {
            progress.handle(&OutputLine {
                source,
                text: text.to_string(),
            });
        }
        assert_eq!(progress.tracker.emitted(), &[10, 25, 50]);
        assert_eq!(progress.files_transferred, Some(1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn scripted_copy_reports_outcome() -> anyhow::Result<()> {
        let script = "printf 'sending incremental file list\\nep.mkv\\n'; \
                      printf '1,000 10%% 1.00MB/s 0:00:10\\r5,000 50%% 1.00MB/s 0:00:05\\r'; \
                      printf '9,999 100%% 1.00MB/s 0:00:00\\n'; \
                      printf 'Number of regular files transferred: 0\\n'";
        let spec = CommandSpec::new("/bin/sh").arg("-c").arg(script);
        let outcome = runner(Ownership { uid: 0, gid: 0 })
            .run(spec, &CancellationToken::new())
            .await?;
        assert!(outcome.success());
        assert_eq!(outcome.milestones, vec![10, 50]);
        assert_eq!(outcome.files_transferred, Some(0));
        assert!(outcome.command.starts_with("/bin/sh -c"));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn scripted_copy_failure_is_not_an_error() -> anyhow::Result<()> {
        let spec = CommandSpec::new("/bin/sh")
            .arg("-c")
            .arg("printf 'rsync: link_stat failed\\n' >&2; exit 23");
        let outcome = runner(Ownership { uid: 0, gid: 0 })
            .run(spec, &CancellationToken::new())
            .await?;
        assert!(!outcome.success());
        assert_eq!(outcome.exit.code, Some(23));
        Ok(())
    }
}
