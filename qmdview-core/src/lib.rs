//! qmdview core
//!
//! Headless search front end for the `qmd` markdown search engine: runs the
//! engine as a subprocess, parses its two output shapes, resolves virtual
//! paths against the collection registry, and drives the search request
//! lifecycle (debounce, explicit confirmation, stale-response discard).
//!
//! Nothing in this crate draws to a terminal.

pub mod client;
pub mod enrich;
pub mod error;
pub mod history;
pub mod indexing;
pub mod orchestrator;
pub mod parser;
pub mod process;
pub mod readiness;
pub mod registry;
pub mod types;

pub use client::{Invocation, InvokeResult, QmdClient};
pub use enrich::{enrich, format_percentage, parse_virtual_path, Relevance, VirtualPath};
pub use error::{EmbedError, FailureKind, HistoryError, InvokeError, ParseError, RegistryError};
pub use history::{HistoryBackend, HistoryScope, HistoryStore, JsonFileBackend, MemoryBackend, MAX_HISTORY};
pub use indexing::{EmbedEvent, EmbedHandle, EmbedJob, IndexingMonitor, IndexingState};
pub use orchestrator::{
    empty_suggestion, Dispatch, OptionRefresh, Orchestrator, OrchestratorSettings, Outcome, SearchCompletion,
    SearchDriver, SearchFailure, SearchPhase, DEBOUNCE_DELAY,
};
pub use process::{CommandRunner, EngineConfig, KillSwitch, ProcessRunner, RawOutput, StreamEvent, StreamHandle, StreamKind};
pub use readiness::{DependencyCheck, EngineLocator, ReadinessStatus};
pub use registry::CollectionRegistry;
pub use types::*;
