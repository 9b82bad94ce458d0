//! qmdview Test Utilities
//!
//! Shared test infrastructure for the qmdview workspace:
//! - A scripted fake engine that replays canned output with per-call delays
//! - Output fixtures in both shapes the engine emits
//! - Proptest generators for queries, scores and modes

pub use qmdview_core::{
    CollectionRegistry, CommandRunner, DependencyCheck, InvokeError, QmdClient, RawOutput,
    ReadinessStatus, SearchMode, SearchResult, StreamEvent, StreamHandle, StreamKind,
};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// SCRIPTED ENGINE
// ============================================================================

/// One canned answer to a `run` call.
#[derive(Debug, Clone)]
pub struct Reply {
    pub delay: Duration,
    pub result: Result<RawOutput, InvokeError>,
}

impl Reply {
    pub fn output(stdout: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(RawOutput {
                stdout: stdout.into(),
                stderr: None,
            }),
        }
    }

    pub fn fail(err: InvokeError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(err),
        }
    }

    /// Respond only after `delay` of (tokio) time.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        if let Ok(output) = &mut self.result {
            output.stderr = Some(stderr.into());
        }
        self
    }
}

/// Canned output for a streamed command.
#[derive(Debug, Clone)]
pub struct StreamScript {
    pub lines: Vec<String>,
    pub line_delay: Duration,
    pub result: Result<(), InvokeError>,
}

impl StreamScript {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            line_delay: Duration::ZERO,
            result: Ok(()),
        }
    }

    pub fn every(mut self, delay: Duration) -> Self {
        self.line_delay = delay;
        self
    }

    pub fn failing(mut self, err: InvokeError) -> Self {
        self.result = Err(err);
        self
    }
}

#[derive(Debug)]
struct Rule {
    prefix: Vec<String>,
    replies: VecDeque<Reply>,
}

/// A [`CommandRunner`] that answers from a script instead of spawning.
///
/// Rules match on an argument prefix; the first matching rule wins. Each
/// call pops the rule's next reply, and the last reply repeats.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    streams: Mutex<Vec<(Vec<String>, StreamScript)>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, prefix: &[&str], reply: Reply) -> Self {
        {
            let mut rules = self.rules.lock().expect("rules lock poisoned");
            let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
            match rules.iter_mut().find(|rule| rule.prefix == prefix) {
                Some(rule) => rule.replies.push_back(reply),
                None => rules.push(Rule {
                    prefix,
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    pub fn on_stream(self, prefix: &[&str], script: StreamScript) -> Self {
        self.streams
            .lock()
            .expect("streams lock poisoned")
            .push((prefix.iter().map(|s| s.to_string()).collect(), script));
        self
    }

    pub fn into_client(self) -> (QmdClient, Arc<ScriptedRunner>) {
        let runner = Arc::new(self);
        (QmdClient::new(runner.clone()), runner)
    }

    /// Every argument vector seen so far, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Calls whose first argument is `subcommand`.
    pub fn calls_to(&self, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|args| args.first().map(String::as_str) == Some(subcommand))
            .count()
    }

    fn record(&self, args: &[String]) {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(args.to_vec());
    }

    fn next_reply(&self, args: &[String]) -> Reply {
        let mut rules = self.rules.lock().expect("rules lock poisoned");
        let Some(rule) = rules.iter_mut().find(|rule| args.starts_with(&rule.prefix)) else {
            return Reply::fail(InvokeError::exit(
                Some(1),
                "",
                Some(format!("unscripted command: {}", args.join(" "))),
            ));
        };
        if rule.replies.len() > 1 {
            rule.replies.pop_front().expect("non-empty queue")
        } else {
            rule.replies.front().cloned().expect("rule has a reply")
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<RawOutput, InvokeError> {
        self.record(args);
        let reply = self.next_reply(args);
        if reply.delay >= timeout {
            tokio::time::sleep(timeout).await;
            return Err(InvokeError::Timeout {
                timeout,
                diagnostics: None,
            });
        }
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }

    fn stream(&self, args: &[String], timeout: Duration) -> Result<StreamHandle, InvokeError> {
        self.record(args);
        let script = self
            .streams
            .lock()
            .expect("streams lock poisoned")
            .iter()
            .find(|(prefix, _)| args.starts_with(prefix))
            .map(|(_, script)| script.clone())
            .ok_or_else(|| InvokeError::Spawn {
                program: "qmd".to_string(),
                message: format!("unscripted stream: {}", args.join(" ")),
            })?;

        let (tx, rx) = mpsc::channel(64);
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + timeout;
            let mut lines = script.lines.into_iter();
            let mut pending = lines.next();
            // A dropped kill sender detaches the run; it does not kill it.
            let mut kill_open = true;
            while let Some(line) = pending.take() {
                tokio::select! {
                    _ = tokio::time::sleep(script.line_delay) => {
                        let _ = tx
                            .send(StreamEvent::Line {
                                stream: StreamKind::Stderr,
                                line,
                            })
                            .await;
                        pending = lines.next();
                    }
                    signal = &mut kill_rx, if kill_open => match signal {
                        Ok(()) => {
                            let _ = tx.send(StreamEvent::Exited(Err(InvokeError::Terminated))).await;
                            return;
                        }
                        Err(_) => {
                            kill_open = false;
                            pending = Some(line);
                        }
                    },
                    _ = tokio::time::sleep_until(deadline) => {
                        let timeout = InvokeError::Timeout { timeout, diagnostics: None };
                        let _ = tx.send(StreamEvent::Exited(Err(timeout))).await;
                        return;
                    }
                }
            }
            let _ = tx.send(StreamEvent::Exited(script.result)).await;
        });
        Ok(StreamHandle::new(rx, kill_tx))
    }
}

// ============================================================================
// READINESS
// ============================================================================

/// Readiness check with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct StaticReadiness {
    pub status: ReadinessStatus,
}

impl StaticReadiness {
    pub fn ready() -> Self {
        Self::default()
    }

    pub fn missing(what: &str) -> Self {
        Self {
            status: ReadinessStatus {
                engine: None,
                missing: vec![what.to_string()],
            },
        }
    }
}

impl DependencyCheck for StaticReadiness {
    fn status(&self) -> ReadinessStatus {
        self.status.clone()
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Engine output samples, in the shapes the engine prints them.

    use super::*;
    use qmdview_core::Collection;
    use std::path::PathBuf;

    /// JSON search output with one hit per `(file, score)`.
    pub fn search_json(hits: &[(&str, f64)]) -> String {
        let records: Vec<serde_json::Value> = hits
            .iter()
            .enumerate()
            .map(|(i, (file, score))| {
                serde_json::json!({
                    "file": file,
                    "docid": format!("#{:06x}", i + 1),
                    "title": format!("Result {}", i + 1),
                    "score": score,
                    "snippet": format!("snippet for {file}"),
                })
            })
            .collect();
        serde_json::Value::Array(records).to_string()
    }

    pub fn hit(file: &str, score: f64) -> SearchResult {
        SearchResult {
            file: file.to_string(),
            docid: "abc123".to_string(),
            title: String::new(),
            score,
            snippet: String::new(),
            line: None,
        }
    }

    pub const COLLECTION_LIST_TEXT: &str = "\
Collections (2):

notes (qmd://notes/)
  Path:     /home/u/notes
  Pattern:  **/*.md
  Files:    1,204
  Embedded: 1,180

work (qmd://work/)
  Path:     /srv/work
  Pattern:  docs/**/*.md
  Files:    87
";

    pub const CONTEXT_LIST_TEXT: &str = "\
Contexts:

qmd://notes/
  /: Personal notes and journal
  /projects: Side project design docs
qmd://work/
  Engineering handbook
";

    pub const LS_TEXT: &str = "\
  2.1 KB  2025-01-03  qmd://notes/journal/2025-01-03.md
  740 B   2024-12-30  qmd://notes/projects/qmdview.md
qmd://notes/todo.md
";

    pub const STATUS_TEXT: &str = "\
QMD Status

Index: /home/u/.cache/qmd/index.sqlite
Size:  48.2 MB

Documents
  Total:    1,291 files indexed
  Vectors:  1,180 embedded
  Pending:  111 need embedding

Collections
  notes (qmd://notes/)
  work (qmd://work/)
";

    pub const INDEX_YAML: &str = "\
collections:
  notes:
    path: /home/u/notes
    pattern: \"**/*.md\"
  work:
    path: /srv/work
    pattern: \"docs/**/*.md\"
";

    /// `notes` rooted at `/home/u/notes`, `work` at `/srv/work`.
    pub fn sample_registry() -> CollectionRegistry {
        CollectionRegistry::from_collections(vec![
            Collection {
                name: "notes".to_string(),
                root: PathBuf::from("/home/u/notes"),
                mask: "**/*.md".to_string(),
                ..Collection::default()
            },
            Collection {
                name: "work".to_string(),
                root: PathBuf::from("/srv/work"),
                mask: "docs/**/*.md".to_string(),
                ..Collection::default()
            },
        ])
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for qmdview inputs.

    use super::*;
    use proptest::prelude::*;

    /// Scores across and slightly beyond the valid range, tier boundaries included.
    pub fn arb_score() -> impl Strategy<Value = f64> {
        prop_oneof![
            0.0f64..=1.0,
            Just(0.0),
            Just(0.4),
            Just(0.70),
            Just(1.0),
        ]
    }

    /// Non-blank search text.
    pub fn arb_query() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9 ]{0,23}"
    }

    pub fn arb_mode() -> impl Strategy<Value = SearchMode> {
        prop_oneof![
            Just(SearchMode::Keyword),
            Just(SearchMode::Semantic),
            Just(SearchMode::Hybrid),
        ]
    }

    /// Gaps between keystrokes, in milliseconds.
    pub fn arb_keystroke_gaps() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(0u64..1000, 1..20)
    }
}
