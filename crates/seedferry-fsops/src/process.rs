//! Streaming runner for long-lived external programs.
//!
//! # Design
//! - Programs are started from an argument vector, never through a shell.
//! - stdout and stderr are drained concurrently; each stream keeps its own order.
//! - Lines are split on `\n` and `\r` so in-place progress updates surface individually.
//! - The child is killed when the deadline elapses, on cancellation, or when dropped.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};

const LINE_BUFFER: usize = 256;

/// Which stream a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// One trimmed, non-empty line of process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Originating stream.
    pub source: StreamSource,
    /// Line content without the terminator.
    pub text: String,
}

/// Exit status of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Program, arguments and deadline for one invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Literal arguments.
    pub args: Vec<OsString>,
    /// Deadline after which the process is killed.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Command without a deadline.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set or clear the deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human-readable command line for diagnostics.
    #[must_use]
    pub fn display(&self) -> String {
        let mut rendered = self.program.clone();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        rendered
    }
}

/// Run `spec`, handing every output line to `on_line` as it arrives.
///
/// Returns once both streams are drained and the process has exited.
///
/// # Errors
///
/// Returns an error when the program cannot be started, when waiting on it
/// fails, when the deadline elapses, or when `cancel` fires. The child is
/// killed in the last two cases.
pub async fn run_streaming<F>(
    spec: &CommandSpec,
    cancel: &CancellationToken,
    mut on_line: F,
) -> FsOpsResult<ProcessExit>
where
    F: FnMut(OutputLine),
{
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| FsOpsError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
    debug!(command = %spec.display(), pid = ?child.id(), "spawned external program");

    let (tx, mut rx) = mpsc::channel(LINE_BUFFER);
    let readers = [
        child
            .stdout
            .take()
            .map(|stdout| spawn_reader(stdout, StreamSource::Stdout, tx.clone())),
        child
            .stderr
            .take()
            .map(|stderr| spawn_reader(stderr, StreamSource::Stderr, tx.clone())),
    ];
    drop(tx);

    let drive = async {
        while let Some(line) = rx.recv().await {
            on_line(line);
        }
        child.wait().await
    };

    let outcome = tokio::select! {
        () = cancel.cancelled() => Err(FsOpsError::Cancelled {
            program: spec.program.clone(),
        }),
        waited = with_deadline(spec.timeout, drive) => match waited {
            Some(Ok(status)) => Ok(ProcessExit { code: status.code() }),
            Some(Err(source)) => Err(FsOpsError::Wait {
                program: spec.program.clone(),
                source,
            }),
            None => Err(FsOpsError::Timeout {
                program: spec.program.clone(),
                after: spec.timeout.unwrap_or_default(),
            }),
        },
    };

    if outcome.is_err() {
        if let Err(err) = child.start_kill() {
            debug!(error = %err, "external program already exited");
        }
        for reader in readers.into_iter().flatten() {
            reader.abort();
        }
    }
    outcome
}

async fn with_deadline<T>(
    deadline: Option<Duration>,
    future: impl Future<Output = T>,
) -> Option<T> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}

fn spawn_reader<R>(
    stream: R,
    source: StreamSource,
    tx: mpsc::Sender<OutputLine>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match read_segment(&mut reader, &mut buffer).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buffer).trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    if tx.send(OutputLine { source, text }).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, stream = ?source, "failed to read program output");
                    break;
                }
            }
        }
    })
}

/// Read bytes up to the next `\n` or `\r`, excluding the terminator.
///
/// Returns the number of bytes consumed; zero means end of stream.
async fn read_segment<R>(reader: &mut R, buffer: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0;
    loop {
        let (terminated, used) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(consumed);
            }
            match available.iter().position(|byte| matches!(byte, b'\n' | b'\r')) {
                Some(index) => {
                    buffer.extend_from_slice(&available[..index]);
                    (true, index + 1)
                }
                None => {
                    buffer.extend_from_slice(available);
                    (false, available.len())
                }
            }
        };
        reader.consume(used);
        consumed += used;
        if terminated {
            return Ok(consumed);
        }
    }
}
