//! Process invoker: runs the engine binary with an augmented search path,
//! enforces timeouts and normalizes every failure into [`InvokeError`].

use crate::error::InvokeError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Timeout for interactive calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for index building.
pub const EMBED_TIMEOUT: Duration = Duration::from_secs(300);

/// Stderr lines kept as diagnostics when a streamed run fails.
pub const STDERR_TAIL_LINES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Engine binary, either a bare name looked up on the search path or a path.
    pub binary: PathBuf,
    /// Directories appended, in order, to the inherited `PATH`.
    pub extra_paths: Vec<PathBuf>,
    pub timeout: Duration,
    pub embed_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("qmd"),
            extra_paths: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            embed_timeout: EMBED_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Inherited `PATH` with `extra_paths` appended.
    pub fn search_path(&self) -> OsString {
        augmented_path(std::env::var_os("PATH"), &self.extra_paths)
    }
}

/// Captured output of a successful run. `stderr` is `None` when blank.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Event from a streamed run. `Exited` is always the last event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Line { stream: StreamKind, line: String },
    Exited(Result<(), InvokeError>),
}

/// One-shot kill signal for a streamed run.
#[derive(Debug)]
pub struct KillSwitch(Option<oneshot::Sender<()>>);

impl KillSwitch {
    pub fn new(sender: oneshot::Sender<()>) -> Self {
        Self(Some(sender))
    }

    /// Ask the process to die. Returns false when it was already signalled
    /// or has exited.
    pub fn kill(&mut self) -> bool {
        match self.0.take() {
            Some(sender) => sender.send(()).is_ok(),
            None => false,
        }
    }
}

/// A detached run: the process keeps going whether or not anyone reads
/// `events`. Dropping the handle does not kill the process.
#[derive(Debug)]
pub struct StreamHandle {
    pub events: mpsc::Receiver<StreamEvent>,
    kill: KillSwitch,
}

impl StreamHandle {
    pub fn new(events: mpsc::Receiver<StreamEvent>, kill: oneshot::Sender<()>) -> Self {
        Self {
            events,
            kill: KillSwitch::new(kill),
        }
    }

    pub fn kill(&mut self) -> bool {
        self.kill.kill()
    }

    /// Separate the event stream from the kill signal so each can have its
    /// own owner.
    pub fn into_parts(self) -> (mpsc::Receiver<StreamEvent>, KillSwitch) {
        (self.events, self.kill)
    }
}

/// Seam between the engine client and the operating system.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output.
    async fn run(&self, args: &[String], timeout: Duration) -> Result<RawOutput, InvokeError>;

    /// Start a long-running command and stream its output lines.
    fn stream(&self, args: &[String], timeout: Duration) -> Result<StreamHandle, InvokeError>;
}

/// Runs the real engine binary.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    search_path: OsString,
}

impl ProcessRunner {
    pub fn new(config: &EngineConfig) -> Self {
        let search_path = config.search_path();
        let program =
            locate_binary(&config.binary, &search_path).unwrap_or_else(|| config.binary.clone());
        Self {
            program,
            search_path,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("PATH", &self.search_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn spawn_error(&self, err: std::io::Error) -> InvokeError {
        InvokeError::Spawn {
            program: self.program_name(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<RawOutput, InvokeError> {
        tracing::debug!(program = %self.program.display(), ?args, "running engine");
        let child = self
            .command(args)
            .spawn()
            .map_err(|err| self.spawn_error(err))?;

        // On timeout the child is dropped with the future and killed.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|err| self.spawn_error(err))?,
            Err(_) => {
                tracing::warn!(?args, timeout_secs = timeout.as_secs(), "engine timed out");
                return Err(InvokeError::Timeout {
                    timeout,
                    diagnostics: None,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = non_blank(String::from_utf8_lossy(&output.stderr).into_owned());
        if !output.status.success() {
            return Err(InvokeError::program_exit(
                &self.program_name(),
                output.status.code(),
                &stdout,
                stderr,
            ));
        }
        Ok(RawOutput { stdout, stderr })
    }

    fn stream(&self, args: &[String], timeout: Duration) -> Result<StreamHandle, InvokeError> {
        tracing::debug!(program = %self.program.display(), ?args, "streaming engine");
        let mut command = self.command(args);
        // Streamed runs are detached; only an explicit kill stops them.
        command.kill_on_drop(false);
        let mut child = command.spawn().map_err(|err| self.spawn_error(err))?;

        let (sender, receiver) = mpsc::channel(256);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let program = self.program_name();
        let mut forwarders: Vec<JoinHandle<Vec<String>>> = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(tokio::spawn(forward_lines(
                stdout,
                StreamKind::Stdout,
                sender.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(tokio::spawn(forward_lines(
                stderr,
                StreamKind::Stderr,
                sender.clone(),
            )));
        }

        tokio::spawn(async move {
            let ending = tokio::select! {
                status = child.wait() => Ending::Status(status),
                _ = tokio::time::sleep(timeout) => Ending::TimedOut,
                Ok(()) = kill_rx => Ending::Killed,
            };

            let outcome = match ending {
                Ending::Status(status) => {
                    // Drain remaining output so `Exited` stays the last event.
                    let mut stderr_tail = Vec::new();
                    for forwarder in forwarders {
                        if let Ok(tail) = forwarder.await {
                            stderr_tail.extend(tail);
                        }
                    }
                    exit_outcome(&program, status, &stderr_tail)
                }
                Ending::TimedOut => {
                    let _ = child.start_kill();
                    forwarders.iter().for_each(JoinHandle::abort);
                    Err(InvokeError::Timeout {
                        timeout,
                        diagnostics: None,
                    })
                }
                Ending::Killed => {
                    let _ = child.start_kill();
                    forwarders.iter().for_each(JoinHandle::abort);
                    Err(InvokeError::Terminated)
                }
            };
            let _ = sender.send(StreamEvent::Exited(outcome)).await;
        });

        Ok(StreamHandle::new(receiver, kill_tx))
    }
}

enum Ending {
    Status(std::io::Result<ExitStatus>),
    TimedOut,
    Killed,
}

fn exit_outcome(
    program: &str,
    status: std::io::Result<ExitStatus>,
    stderr_tail: &[String],
) -> Result<(), InvokeError> {
    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            let diagnostics = non_blank(stderr_tail.join("\n"));
            tracing::warn!(program, code = ?status.code(), "streamed engine run failed");
            Err(InvokeError::program_exit(program, status.code(), "", diagnostics))
        }
        Err(err) => Err(InvokeError::Spawn {
            program: program.to_string(),
            message: err.to_string(),
        }),
    }
}

/// Forward lines as events. Returns the last stderr lines seen.
async fn forward_lines<R>(
    reader: R,
    stream: StreamKind,
    sender: mpsc::Sender<StreamEvent>,
) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if stream == StreamKind::Stderr && !line.trim().is_empty() {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.clone());
        }
        if sender.send(StreamEvent::Line { stream, line }).await.is_err() {
            break;
        }
    }
    tail.into()
}

/// Append `extra` to an inherited search path, skipping duplicates.
pub fn augmented_path(existing: Option<OsString>, extra: &[PathBuf]) -> OsString {
    let mut dirs: Vec<PathBuf> = existing
        .as_deref()
        .map(|path| std::env::split_paths(path).collect())
        .unwrap_or_default();
    for dir in extra {
        if !dirs.contains(dir) {
            dirs.push(dir.clone());
        }
    }
    std::env::join_paths(dirs).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not extend search path");
        existing.unwrap_or_default()
    })
}

/// Resolve `binary` against `search_path`. Paths with a directory part are
/// checked as given.
pub fn locate_binary(binary: &Path, search_path: &OsStr) -> Option<PathBuf> {
    if binary.components().count() > 1 {
        return binary.is_file().then(|| binary.to_path_buf());
    }
    std::env::split_paths(search_path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_paths_are_appended_in_order() {
        let existing = std::env::join_paths(["/usr/bin", "/bin"]).ok();
        let joined = augmented_path(
            existing,
            &[PathBuf::from("/opt/homebrew/bin"), PathBuf::from("/usr/bin")],
        );
        let dirs: Vec<PathBuf> = std::env::split_paths(&joined).collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin"),
                PathBuf::from("/opt/homebrew/bin"),
            ]
        );
    }

    #[test]
    fn extra_paths_used_when_nothing_inherited() {
        let joined = augmented_path(None, &[PathBuf::from("/home/u/.bun/bin")]);
        let dirs: Vec<PathBuf> = std::env::split_paths(&joined).collect();
        assert_eq!(dirs, vec![PathBuf::from("/home/u/.bun/bin")]);
    }

    #[test]
    fn locate_binary_scans_search_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("qmd"), b"#!/bin/sh\n").unwrap();

        let search_path =
            std::env::join_paths([PathBuf::from("/nonexistent"), dir.path().to_path_buf()])
                .unwrap();
        assert_eq!(
            locate_binary(Path::new("qmd"), &search_path),
            Some(dir.path().join("qmd"))
        );
        assert_eq!(locate_binary(Path::new("missing-engine"), &search_path), None);
    }

    #[cfg(unix)]
    #[test]
    fn failed_stream_names_program_and_keeps_stderr_tail() {
        use std::os::unix::process::ExitStatusExt;

        let tail = vec!["loading model".to_string(), "out of memory".to_string()];
        let err = exit_outcome("/opt/bin/qmd", Ok(ExitStatus::from_raw(3 << 8)), &tail).unwrap_err();
        assert_eq!(
            err,
            InvokeError::Exit {
                code: Some(3),
                message: "loading model".to_string(),
                diagnostics: Some("loading model\nout of memory".to_string()),
            }
        );

        let silent = exit_outcome("/opt/bin/qmd", Ok(ExitStatus::from_raw(3 << 8)), &[]).unwrap_err();
        assert_eq!(silent.to_string(), "/opt/bin/qmd exited with status 3");
        assert_eq!(
            exit_outcome("/opt/bin/qmd", Ok(ExitStatus::from_raw(0)), &tail),
            Ok(())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streamed_failure_reports_last_stderr_lines() {
        let runner = ProcessRunner::new(&EngineConfig {
            binary: PathBuf::from("sh"),
            ..EngineConfig::default()
        });
        let script = "for i in 1 2 3 4 5 6 7; do echo line$i >&2; done; exit 2";
        let args = vec!["-c".to_string(), script.to_string()];
        let (mut events, _kill) = runner.stream(&args, Duration::from_secs(10)).unwrap().into_parts();

        let mut exited = None;
        while let Some(event) = events.recv().await {
            if let StreamEvent::Exited(outcome) = event {
                exited = Some(outcome);
            }
        }
        match exited {
            Some(Err(InvokeError::Exit { code, diagnostics, .. })) => {
                assert_eq!(code, Some(2));
                assert_eq!(diagnostics.as_deref(), Some("line3\nline4\nline5\nline6\nline7"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn blank_stderr_is_dropped() {
        assert_eq!(non_blank(" \n".to_string()), None);
        assert_eq!(non_blank("warn".to_string()), Some("warn".to_string()));
    }
}
