//! Indexing state: whether this process is currently building embeddings.
//!
//! [`IndexingState`] is created once per session and injected wherever the
//! flag is read or written. It only sees operations this process started;
//! an embed launched from another shell is invisible to it.

use crate::client::QmdClient;
use crate::error::EmbedError;
use crate::process::{KillSwitch, StreamEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Poll interval of [`IndexingMonitor`].
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

const IDLE: u64 = 0;

/// Session-scoped "an embedding operation is active" flag.
///
/// Each start takes a fresh token; finishing with a stale token is a no-op,
/// so a job that was terminated and replaced cannot clear its successor.
#[derive(Debug, Clone, Default)]
pub struct IndexingState {
    active: Arc<AtomicU64>,
    tokens: Arc<AtomicU64>,
}

impl IndexingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) != IDLE
    }

    /// Mark an operation as started. `None` when one is already active.
    pub fn try_begin(&self) -> Option<u64> {
        let token = self.tokens.fetch_add(1, Ordering::SeqCst) + 1;
        self.active
            .compare_exchange(IDLE, token, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| token)
    }

    /// Clear the flag if `token` still owns it.
    pub fn finish(&self, token: u64) -> bool {
        self.active
            .compare_exchange(token, IDLE, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Publishes [`IndexingState::is_active`] on a watch channel, sampled at a
/// fixed interval.
#[derive(Debug, Clone)]
pub struct IndexingMonitor {
    state: IndexingState,
    interval: Duration,
}

impl IndexingMonitor {
    pub fn new(state: IndexingState, interval: Duration) -> Self {
        Self { state, interval }
    }

    /// Start polling. The task ends once every receiver is dropped.
    pub fn spawn(self) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(self.state.is_active());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let active = self.state.is_active();
                        tx.send_if_modified(|current| {
                            let changed = *current != active;
                            *current = active;
                            changed
                        });
                    }
                    _ = tx.closed() => break,
                }
            }
        });
        rx
    }
}

/// Progress of a background embedding run. Exactly one terminal event
/// (`Finished` or `Failed`) ends every stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedEvent {
    Progress(String),
    Finished,
    Failed(String),
}

/// Control side of a running embed.
#[derive(Debug)]
pub struct EmbedHandle {
    kill: KillSwitch,
    state: IndexingState,
    token: u64,
}

impl EmbedHandle {
    /// Kill the process and clear the active flag right away, whether or
    /// not the process has exited yet.
    pub fn terminate(&mut self) {
        let signalled = self.kill.kill();
        self.state.finish(self.token);
        tracing::info!(signalled, "embedding terminated");
    }
}

pub struct EmbedJob;

impl EmbedJob {
    /// Start `embed` unless another embedding operation is active.
    pub fn start(
        client: &QmdClient,
        state: &IndexingState,
        force: bool,
    ) -> Result<(EmbedHandle, mpsc::Receiver<EmbedEvent>), EmbedError> {
        let token = state.try_begin().ok_or(EmbedError::AlreadyRunning)?;
        let stream = match client.embed(force) {
            Ok(stream) => stream,
            Err(err) => {
                state.finish(token);
                return Err(err.into());
            }
        };
        tracing::info!(force, "embedding started");

        let (mut events, kill) = stream.into_parts();
        let (tx, rx) = mpsc::channel(256);
        let task_state = state.clone();
        tokio::spawn(async move {
            let mut terminal = EmbedEvent::Failed("embedding output ended unexpectedly".to_string());
            while let Some(event) = events.recv().await {
                match event {
                    StreamEvent::Line { line, .. } => {
                        if let Some(progress) = progress_text(&line) {
                            // A closed receiver only means nobody is watching.
                            let _ = tx.send(EmbedEvent::Progress(progress)).await;
                        }
                    }
                    StreamEvent::Exited(Ok(())) => {
                        terminal = EmbedEvent::Finished;
                        break;
                    }
                    StreamEvent::Exited(Err(err)) => {
                        terminal = EmbedEvent::Failed(err.to_string());
                        break;
                    }
                }
            }
            task_state.finish(token);
            match &terminal {
                EmbedEvent::Failed(message) => tracing::warn!(%message, "embedding failed"),
                _ => tracing::info!("embedding finished"),
            }
            let _ = tx.send(terminal).await;
        });

        Ok((
            EmbedHandle {
                kill,
                state: state.clone(),
                token,
            },
            rx,
        ))
    }
}

/// Progress bars redraw with carriage returns; keep the final frame.
fn progress_text(line: &str) -> Option<String> {
    line.split('\r')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
