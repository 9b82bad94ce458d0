//! Record types shared by the invoker, parsers, enricher and orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// SEARCH MODES
// ============================================================================

/// Cost class of a search mode. Decides whether a query auto-fires after
/// the debounce window or waits for an explicit trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostClass {
    Cheap,
    Expensive,
}

/// The three ways the engine can search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// BM25 full-text search (`search`).
    Keyword,
    /// Vector similarity search (`vsearch`).
    Semantic,
    /// Query expansion plus reranking (`query`).
    Hybrid,
}

impl SearchMode {
    pub fn all() -> &'static [SearchMode] {
        &[SearchMode::Keyword, SearchMode::Semantic, SearchMode::Hybrid]
    }

    /// Engine subcommand that runs this mode.
    pub fn subcommand(&self) -> &'static str {
        match self {
            SearchMode::Keyword => "search",
            SearchMode::Semantic => "vsearch",
            SearchMode::Hybrid => "query",
        }
    }

    pub fn from_subcommand(name: &str) -> Option<SearchMode> {
        Self::all()
            .iter()
            .copied()
            .find(|mode| mode.subcommand() == name)
    }

    pub fn cost(&self) -> CostClass {
        match self {
            SearchMode::Keyword => CostClass::Cheap,
            SearchMode::Semantic | SearchMode::Hybrid => CostClass::Expensive,
        }
    }

    pub fn is_cheap(&self) -> bool {
        self.cost() == CostClass::Cheap
    }

    pub fn title(&self) -> &'static str {
        match self {
            SearchMode::Keyword => "Keyword",
            SearchMode::Semantic => "Semantic",
            SearchMode::Hybrid => "Hybrid",
        }
    }

    /// Stable key used to namespace persisted state per mode.
    pub fn key(&self) -> &'static str {
        match self {
            SearchMode::Keyword => "keyword",
            SearchMode::Semantic => "semantic",
            SearchMode::Hybrid => "hybrid",
        }
    }

    pub fn next(&self) -> SearchMode {
        match self {
            SearchMode::Keyword => SearchMode::Semantic,
            SearchMode::Semantic => SearchMode::Hybrid,
            SearchMode::Hybrid => SearchMode::Keyword,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

/// Monotonic identity assigned to each dispatched search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Filter and display options read when a request is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub collection: Option<String>,
    pub limit: u32,
    pub min_score: Option<f64>,
    /// Return the full document instead of a snippet.
    pub full: bool,
    pub line_numbers: bool,
    /// Return every match above the threshold, ignoring `limit`.
    pub all: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            collection: None,
            limit: 20,
            min_score: None,
            full: false,
            line_numbers: false,
            all: false,
        }
    }
}

/// A single search attempt. Built fresh per dispatch, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    pub mode: SearchMode,
    pub options: SearchOptions,
}

impl QueryRequest {
    /// Engine argument vector:
    /// `<mode> <query> -n <count> [-c <collection>] [--min-score <f>] [--full] [--line-numbers] [--all] --json`
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            self.mode.subcommand().to_string(),
            self.query.clone(),
            "-n".to_string(),
            self.options.limit.to_string(),
        ];
        if let Some(collection) = &self.options.collection {
            args.push("-c".to_string());
            args.push(collection.clone());
        }
        if let Some(min_score) = self.options.min_score {
            args.push("--min-score".to_string());
            args.push(min_score.to_string());
        }
        if self.options.full {
            args.push("--full".to_string());
        }
        if self.options.line_numbers {
            args.push("--line-numbers".to_string());
        }
        if self.options.all {
            args.push("--all".to_string());
        }
        args.push("--json".to_string());
        args
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// A search hit as the engine reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Virtual path, usually `qmd://<collection>/<relative path>`.
    pub file: String,
    /// Short content hash, without the leading `#`.
    pub docid: String,
    pub title: String,
    /// Relevance in `[0, 1]`.
    pub score: f64,
    pub snippet: String,
    pub line: Option<u32>,
}

/// A hit plus the fields derived from the collection registry.
///
/// `absolute_path` is advisory: the engine normalizes file names, so a
/// missing file on disk says nothing about search correctness.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedResult {
    pub raw: SearchResult,
    pub collection: Option<String>,
    pub relative_path: String,
    pub absolute_path: Option<PathBuf>,
}

// ============================================================================
// ENGINE RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub root: PathBuf,
    pub mask: String,
    pub documents: u64,
    pub embedded: u64,
    pub exists: bool,
}

/// Free-text description attached to a path inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextEntry {
    pub collection: String,
    pub path: String,
    pub description: String,
}

/// One line of `ls` output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileEntry {
    pub reference: String,
    /// Size/date columns the engine printed before the path, kept verbatim.
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub reference: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexStatus {
    pub index_path: String,
    pub index_size: String,
    pub total_documents: u64,
    pub embedded_documents: u64,
    pub pending_embeddings: u64,
    pub collections: Vec<String>,
}

impl IndexStatus {
    pub fn embedded_ratio(&self) -> f64 {
        if self.total_documents == 0 {
            return 0.0;
        }
        (self.embedded_documents as f64 / self.total_documents as f64).clamp(0.0, 1.0)
    }
}

// ============================================================================
// HISTORY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub mode: SearchMode,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_is_the_only_cheap_mode() {
        assert!(SearchMode::Keyword.is_cheap());
        assert!(!SearchMode::Semantic.is_cheap());
        assert!(!SearchMode::Hybrid.is_cheap());
    }

    #[test]
    fn subcommands_round_trip() {
        for mode in SearchMode::all() {
            assert_eq!(SearchMode::from_subcommand(mode.subcommand()), Some(*mode));
        }
        assert_eq!(SearchMode::from_subcommand("status"), None);
    }

    #[test]
    fn request_args_include_every_option() {
        let request = QueryRequest {
            query: "rust async".to_string(),
            mode: SearchMode::Hybrid,
            options: SearchOptions {
                collection: Some("notes".to_string()),
                limit: 5,
                min_score: Some(0.25),
                full: true,
                line_numbers: true,
                all: true,
            },
        };
        assert_eq!(
            request.to_args(),
            vec![
                "query", "rust async", "-n", "5", "-c", "notes", "--min-score", "0.25",
                "--full", "--line-numbers", "--all", "--json",
            ]
        );
    }

    #[test]
    fn request_args_omit_unset_options() {
        let request = QueryRequest {
            query: "alpha".to_string(),
            mode: SearchMode::Keyword,
            options: SearchOptions::default(),
        };
        assert_eq!(request.to_args(), vec!["search", "alpha", "-n", "20", "--json"]);
    }

    #[test]
    fn request_ids_only_grow() {
        let first = RequestId::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 1);
    }
}
