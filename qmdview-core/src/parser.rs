//! Output parsers, one per engine subcommand.
//!
//! The engine answers some subcommands in JSON and others in indented text.
//! Each parser here accepts either shape and returns the same record type,
//! so nothing above this module ever branches on the output shape.
//!
//! Text parsing is line oriented. Malformed records are skipped or filled
//! with defaults; only an unrecognized overall shape is an error.

use crate::error::ParseError;
use crate::types::{Collection, ContextEntry, Document, FileEntry, IndexStatus, SearchResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

/// `name` or `name (qmd://name/)`, not indented.
static COLLECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_.\-]+)(?:\s+\(([A-Za-z][A-Za-z0-9+.\-]*://[^)]*)\))?\s*$")
        .expect("collection header regex is valid")
});

/// Indented `Key: value`.
static KEY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z \-]*?)\s*:\s*(.*?)\s*$").expect("key/value regex is valid")
});

static FIRST_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*").expect("integer regex is valid"));

/// Shape of a raw payload, decided from its first meaningful character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    Json,
    Text,
}

pub fn detect_shape(raw: &str) -> OutputShape {
    match raw.trim_start().chars().next() {
        Some('[') | Some('{') => OutputShape::Json,
        _ => OutputShape::Text,
    }
}

// ============================================================================
// SEARCH
// ============================================================================

#[derive(Debug, Deserialize)]
struct JsonHit {
    #[serde(default, alias = "path", alias = "filepath")]
    file: String,
    #[serde(default, alias = "id", alias = "hash")]
    docid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    score: f64,
    #[serde(default, alias = "context", alias = "body")]
    snippet: String,
    #[serde(default, alias = "lineNumber", alias = "line_number")]
    line: Option<u32>,
}

impl From<JsonHit> for SearchResult {
    fn from(hit: JsonHit) -> Self {
        let score = if hit.score.is_finite() {
            hit.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            file: hit.file,
            docid: hit.docid.trim_start_matches('#').to_string(),
            title: hit.title,
            score,
            snippet: hit.snippet,
            line: hit.line,
        }
    }
}

/// Parse `search`/`vsearch`/`query` output. A blank payload or one that
/// starts with `No results` is an empty result set.
pub fn parse_search(raw: &str) -> Result<Vec<SearchResult>, ParseError> {
    match detect_shape(raw) {
        OutputShape::Json => {
            let records = json_records(raw, &["results", "hits"])?;
            Ok(records
                .into_iter()
                .filter_map(|value| serde_json::from_value::<JsonHit>(value).ok())
                .filter(|hit| !hit.file.is_empty())
                .map(SearchResult::from)
                .collect())
        }
        OutputShape::Text => {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with("No results") {
                Ok(Vec::new())
            } else {
                Err(ParseError::UnrecognizedShape { what: "search" })
            }
        }
    }
}

// ============================================================================
// COLLECTIONS
// ============================================================================

#[derive(Debug, Deserialize)]
struct JsonCollection {
    name: String,
    #[serde(default, alias = "path", alias = "pwd")]
    root: PathBuf,
    #[serde(default, alias = "pattern", alias = "glob_pattern")]
    mask: String,
    #[serde(default, alias = "files", alias = "active_count")]
    documents: u64,
    #[serde(default, alias = "vectors")]
    embedded: u64,
}

/// Parse `collection list`.
pub fn parse_collections(raw: &str) -> Result<Vec<Collection>, ParseError> {
    if detect_shape(raw) == OutputShape::Json {
        let records = json_records(raw, &["collections"])?;
        return Ok(records
            .into_iter()
            .filter_map(|value| serde_json::from_value::<JsonCollection>(value).ok())
            .map(|c| Collection {
                name: c.name,
                root: c.root,
                mask: c.mask,
                documents: c.documents,
                embedded: c.embedded,
                exists: false,
            })
            .collect());
    }

    let mut collections = Vec::new();
    let mut current: Option<Collection> = None;
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !is_indented(line) {
            if let Some(caps) = COLLECTION_HEADER.captures(line.trim_end()) {
                collections.extend(current.take());
                current = Some(Collection {
                    name: caps[1].to_string(),
                    ..Collection::default()
                });
            }
            continue;
        }
        let (Some(collection), Some((key, value))) = (current.as_mut(), key_value(line)) else {
            continue;
        };
        match key.as_str() {
            "path" | "root" | "directory" => collection.root = PathBuf::from(value),
            "pattern" | "mask" | "glob" => collection.mask = value,
            "files" | "documents" | "docs" => collection.documents = first_integer(&value),
            "embedded" | "vectors" => collection.embedded = first_integer(&value),
            _ => {}
        }
    }
    collections.extend(current);
    Ok(collections)
}

// ============================================================================
// CONTEXTS
// ============================================================================

#[derive(Debug, Deserialize)]
struct JsonContext {
    #[serde(default)]
    collection: String,
    #[serde(default)]
    path: String,
    #[serde(default, alias = "context", alias = "text")]
    description: String,
}

/// Parse `context list`: a collection header followed by indented
/// `path: description` lines.
pub fn parse_contexts(raw: &str) -> Result<Vec<ContextEntry>, ParseError> {
    if detect_shape(raw) == OutputShape::Json {
        let records = json_records(raw, &["contexts"])?;
        return Ok(records
            .into_iter()
            .filter_map(|value| serde_json::from_value::<JsonContext>(value).ok())
            .map(|c| ContextEntry {
                collection: c.collection,
                path: if c.path.is_empty() { "/".to_string() } else { c.path },
                description: c.description,
            })
            .collect());
    }

    let mut entries = Vec::new();
    let mut collection: Option<String> = None;
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !is_indented(line) {
            let header = trimmed.trim_end_matches(':');
            if header.to_ascii_lowercase().starts_with("contexts") {
                continue;
            }
            collection = Some(collection_name(header));
            continue;
        }
        let Some(collection) = collection.as_ref() else {
            continue;
        };
        let (path, description) = match trimmed.split_once(": ") {
            Some((path, description)) => (path.trim(), description.trim()),
            None => ("/", trimmed),
        };
        entries.push(ContextEntry {
            collection: collection.clone(),
            path: path.to_string(),
            description: description.to_string(),
        });
    }
    Ok(entries)
}

// ============================================================================
// LS
// ============================================================================

/// Parse `ls`: one file per line, the virtual path is the token that
/// carries a scheme; leading columns are kept as details.
pub fn parse_listing(raw: &str) -> Result<Vec<FileEntry>, ParseError> {
    if detect_shape(raw) == OutputShape::Json {
        let records = json_records(raw, &["files"])?;
        return Ok(records
            .into_iter()
            .filter_map(|value| match value {
                Value::String(reference) => Some(reference),
                Value::Object(map) => map
                    .get("path")
                    .or_else(|| map.get("file"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .map(|reference| FileEntry {
                reference,
                details: None,
            })
            .collect());
    }

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.iter().position(|token| token.contains("://")) {
                Some(index) => {
                    let details = tokens[..index].join(" ");
                    FileEntry {
                        reference: tokens[index..].join(" "),
                        details: (!details.is_empty()).then_some(details),
                    }
                }
                None => FileEntry {
                    reference: line.to_string(),
                    details: None,
                },
            }
        })
        .collect())
}

// ============================================================================
// GET
// ============================================================================

/// `get` prints the document itself.
pub fn parse_document(reference: &str, raw: &str) -> Result<Document, ParseError> {
    Ok(Document {
        reference: reference.to_string(),
        body: raw.to_string(),
    })
}

// ============================================================================
// STATUS
// ============================================================================

/// Parse `status`. Unknown keys are ignored; at least one known key must be
/// present for the output to be recognized.
pub fn parse_status(raw: &str) -> Result<IndexStatus, ParseError> {
    if detect_shape(raw) == OutputShape::Json {
        return serde_json::from_str::<IndexStatus>(raw)
            .map_err(|err| ParseError::InvalidJson(err.to_string()));
    }

    let mut status = IndexStatus::default();
    let mut recognized = false;
    let mut in_collections = false;
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !is_indented(line) {
            in_collections = trimmed.to_ascii_lowercase().starts_with("collections");
            if in_collections {
                recognized = true;
                continue;
            }
        }
        if in_collections {
            if let Some(caps) = COLLECTION_HEADER.captures(trimmed) {
                status.collections.push(caps[1].to_string());
                continue;
            }
        }
        let Some((key, value)) = key_value(line) else {
            continue;
        };
        let before = recognized;
        recognized = true;
        match key.as_str() {
            "index" | "database" => status.index_path = value,
            "size" => status.index_size = value,
            "total" | "documents" | "files" if !in_collections => {
                status.total_documents = first_integer(&value)
            }
            "vectors" | "embedded" if !in_collections => {
                status.embedded_documents = first_integer(&value)
            }
            "pending" | "need embedding" => status.pending_embeddings = first_integer(&value),
            _ => recognized = before,
        }
    }

    if recognized {
        Ok(status)
    } else {
        Err(ParseError::UnrecognizedShape { what: "status" })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Top-level JSON array, or an object wrapping one under a known key.
fn json_records(raw: &str, keys: &[&str]) -> Result<Vec<Value>, ParseError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| ParseError::InvalidJson(err.to_string()))?;
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(records)) => Some(records),
                _ => None,
            })
            .ok_or(ParseError::UnrecognizedShape { what: "JSON" }),
        _ => Err(ParseError::UnrecognizedShape { what: "JSON" }),
    }
}

fn is_indented(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn key_value(line: &str) -> Option<(String, String)> {
    let caps = KEY_VALUE.captures(line)?;
    Some((caps[1].to_ascii_lowercase(), caps[2].to_string()))
}

/// First integer in `text`, ignoring thousands separators; zero if none.
fn first_integer(text: &str) -> u64 {
    FIRST_INTEGER
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}

/// `qmd://notes/` → `notes`; anything else is taken as the name.
fn collection_name(header: &str) -> String {
    match header.split_once("://") {
        Some((_, rest)) => rest.trim_end_matches('/').split('/').next().unwrap_or("").to_string(),
        None => header.to_string(),
    }
}
