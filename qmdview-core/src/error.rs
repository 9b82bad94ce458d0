//! Error types for qmdview operations

use std::time::Duration;
use thiserror::Error;

/// Output did not have the shape the parser for that subcommand expects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("unrecognized {what} output")]
    UnrecognizedShape { what: &'static str },
}

/// Classification of an engine failure. Callers switch on this rather than
/// on the error variant so there is one handling path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Spawn,
    Exit,
    Timeout,
    Terminated,
    Parse,
}

/// Engine invocation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvokeError {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{message}")]
    Exit {
        code: Option<i32>,
        message: String,
        diagnostics: Option<String>,
    },

    #[error("engine timed out after {}s", timeout.as_secs())]
    Timeout {
        timeout: Duration,
        diagnostics: Option<String>,
    },

    #[error("engine process was terminated")]
    Terminated,

    #[error("could not read engine output: {source}")]
    Parse {
        source: ParseError,
        raw: String,
        diagnostics: Option<String>,
    },
}

impl InvokeError {
    /// Build an exit error from captured output. The message is the first
    /// non-blank stderr line, then stdout, then the bare status.
    pub fn exit(code: Option<i32>, stdout: &str, stderr: Option<String>) -> Self {
        Self::program_exit("qmd", code, stdout, stderr)
    }

    /// As [`InvokeError::exit`], naming `program` in the bare-status message.
    pub fn program_exit(
        program: &str,
        code: Option<i32>,
        stdout: &str,
        stderr: Option<String>,
    ) -> Self {
        let message = stderr
            .as_deref()
            .and_then(first_line)
            .or_else(|| first_line(stdout))
            .map(str::to_string)
            .unwrap_or_else(|| match code {
                Some(code) => format!("{program} exited with status {code}"),
                None => format!("{program} was terminated by a signal"),
            });
        Self::Exit {
            code,
            message,
            diagnostics: stderr,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Spawn { .. } => FailureKind::Spawn,
            Self::Exit { .. } => FailureKind::Exit,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Terminated => FailureKind::Terminated,
            Self::Parse { .. } => FailureKind::Parse,
        }
    }

    /// Text from stderr, when the engine wrote any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Exit { diagnostics, .. }
            | Self::Timeout { diagnostics, .. }
            | Self::Parse { diagnostics, .. } => diagnostics.as_deref(),
            Self::Spawn { .. } | Self::Terminated => None,
        }
    }

    /// Unparsed stdout for parse failures.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => Some(raw.as_str()),
            _ => None,
        }
    }

    /// The engine reports an empty result set as a failure on some paths.
    /// That is a normal empty outcome, not an error.
    pub fn is_no_results(&self) -> bool {
        const MARKER: &str = "No results";
        match self {
            Self::Exit {
                message,
                diagnostics,
                ..
            } => {
                message.contains(MARKER)
                    || diagnostics.as_deref().is_some_and(|d| d.contains(MARKER))
            }
            _ => false,
        }
    }
}

/// History persistence errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Collection registry loading errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read index config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse index config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Background embedding errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmbedError {
    #[error("an indexing operation is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_message_prefers_stderr() {
        let err = InvokeError::exit(Some(1), "partial", Some("\n  boom\nmore".to_string()));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.diagnostics(), Some("\n  boom\nmore"));
        assert_eq!(err.kind(), FailureKind::Exit);
    }

    #[test]
    fn exit_message_falls_back_to_status() {
        let err = InvokeError::exit(Some(3), "  ", None);
        assert_eq!(err.to_string(), "qmd exited with status 3");
    }

    #[test]
    fn no_results_detected_in_message_or_diagnostics() {
        let in_message = InvokeError::exit(Some(1), "No results found.", None);
        assert!(in_message.is_no_results());

        let in_stderr = InvokeError::Exit {
            code: Some(1),
            message: "search failed".to_string(),
            diagnostics: Some("warning\nNo results for query".to_string()),
        };
        assert!(in_stderr.is_no_results());

        let timeout = InvokeError::Timeout {
            timeout: Duration::from_secs(30),
            diagnostics: Some("No results".to_string()),
        };
        assert!(!timeout.is_no_results());
    }
}
