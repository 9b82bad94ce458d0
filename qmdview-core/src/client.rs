//! Typed engine client: one operation per engine subcommand.

use crate::error::{InvokeError, ParseError};
use crate::parser;
use crate::process::{CommandRunner, EngineConfig, ProcessRunner, StreamHandle};
use crate::types::{Collection, ContextEntry, Document, FileEntry, IndexStatus, QueryRequest, SearchResult};
use std::sync::Arc;
use std::time::Duration;

/// Parsed payload plus whatever the engine wrote to stderr on success.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation<T> {
    pub data: T,
    pub diagnostics: Option<String>,
}

pub type InvokeResult<T> = Result<Invocation<T>, InvokeError>;

#[derive(Clone)]
pub struct QmdClient {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    embed_timeout: Duration,
}

impl std::fmt::Debug for QmdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QmdClient")
            .field("timeout", &self.timeout)
            .field("embed_timeout", &self.embed_timeout)
            .finish_non_exhaustive()
    }
}

impl QmdClient {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            runner,
            timeout: defaults.timeout,
            embed_timeout: defaults.embed_timeout,
        }
    }

    /// Client over the real engine binary described by `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Arc::new(ProcessRunner::new(config)))
            .with_timeouts(config.timeout, config.embed_timeout)
    }

    pub fn with_timeouts(mut self, timeout: Duration, embed_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.embed_timeout = embed_timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn invoke<T, F>(&self, args: Vec<String>, parse: F) -> InvokeResult<T>
    where
        F: FnOnce(&str) -> Result<T, ParseError>,
    {
        let output = self.runner.run(&args, self.timeout).await?;
        match parse(&output.stdout) {
            Ok(data) => Ok(Invocation {
                data,
                diagnostics: output.stderr,
            }),
            Err(source) => {
                tracing::warn!(subcommand = %args[0], error = %source, "unparseable engine output");
                Err(InvokeError::Parse {
                    source,
                    raw: output.stdout,
                    diagnostics: output.stderr,
                })
            }
        }
    }

    /// Run a search in the request's mode.
    pub async fn search(&self, request: &QueryRequest) -> InvokeResult<Vec<SearchResult>> {
        self.invoke(request.to_args(), parser::parse_search).await
    }

    pub async fn collections(&self) -> InvokeResult<Vec<Collection>> {
        self.invoke(args(["collection", "list"]), parser::parse_collections)
            .await
    }

    pub async fn contexts(&self) -> InvokeResult<Vec<ContextEntry>> {
        self.invoke(args(["context", "list"]), parser::parse_contexts)
            .await
    }

    /// List files, optionally under a collection or virtual path.
    pub async fn ls(&self, path: Option<&str>) -> InvokeResult<Vec<FileEntry>> {
        let mut argv = args(["ls"]);
        argv.extend(path.map(str::to_string));
        self.invoke(argv, parser::parse_listing).await
    }

    pub async fn get(&self, reference: &str) -> InvokeResult<Document> {
        self.invoke(args(["get", reference]), |raw| {
            parser::parse_document(reference, raw)
        })
        .await
    }

    pub async fn status(&self) -> InvokeResult<IndexStatus> {
        self.invoke(args(["status"]), parser::parse_status).await
    }

    /// Remove orphaned index data. Returns the engine's summary text.
    pub async fn cleanup(&self) -> InvokeResult<String> {
        self.invoke(args(["cleanup"]), |raw| Ok(raw.trim().to_string()))
            .await
    }

    /// Start building embeddings, streamed and detached.
    pub fn embed(&self, force: bool) -> Result<StreamHandle, InvokeError> {
        let mut argv = args(["embed"]);
        if force {
            argv.push("-f".to_string());
        }
        self.runner.stream(&argv, self.embed_timeout)
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}
