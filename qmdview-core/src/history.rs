//! Query history: most-recent-first, unique per query, bounded.
//!
//! The in-memory list is authoritative for the session. Every mutation is
//! written through to a [`HistoryBackend`]; a failed write is logged and
//! remembered, never propagated into the search flow.

use crate::error::HistoryError;
use crate::types::{HistoryEntry, SearchMode, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Entries retained per key.
pub const MAX_HISTORY: usize = 10;

/// Whether each search mode keeps its own history or all modes share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryScope {
    #[default]
    PerMode,
    Global,
}

impl HistoryScope {
    /// Durable key for `mode` under this scope.
    pub fn key(&self, mode: SearchMode) -> String {
        match self {
            HistoryScope::PerMode => format!("history.{}", mode.key()),
            HistoryScope::Global => "history.all".to_string(),
        }
    }
}

/// Durable key/value storage for serialized history lists.
pub trait HistoryBackend: Send {
    fn load(&self, key: &str) -> Result<Vec<HistoryEntry>, HistoryError>;
    fn save(&mut self, key: &str, entries: &[HistoryEntry]) -> Result<(), HistoryError>;
}

/// Every key in a single pretty-printed JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Vec<HistoryEntry>>, HistoryError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Where an unreadable history file is moved before it is replaced.
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    /// Existing entries for a rewrite. A file that no longer parses is moved
    /// aside so the next write starts from an empty map.
    fn read_for_rewrite(&self) -> Result<BTreeMap<String, Vec<HistoryEntry>>, HistoryError> {
        match self.read_all() {
            Err(HistoryError::Serde(err)) => {
                let backup = self.backup_path();
                tracing::warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %err,
                    "history file is corrupt, starting over"
                );
                std::fs::rename(&self.path, &backup)?;
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_all(&self, all: &BTreeMap<String, Vec<HistoryEntry>>) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(all)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl HistoryBackend for JsonFileBackend {
    fn load(&self, key: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.read_all()?.remove(key).unwrap_or_default())
    }

    fn save(&mut self, key: &str, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let mut all = self.read_for_rewrite()?;
        if entries.is_empty() {
            all.remove(key);
        } else {
            all.insert(key.to_string(), entries.to_vec());
        }
        self.write_all(&all)
    }
}

/// Process-lifetime storage, used when no history file is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, Vec<HistoryEntry>>,
}

impl HistoryBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.entries.get(key).cloned().unwrap_or_default())
    }

    fn save(&mut self, key: &str, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        self.entries.insert(key.to_string(), entries.to_vec());
        Ok(())
    }
}

pub struct HistoryStore {
    backend: Box<dyn HistoryBackend>,
    scope: HistoryScope,
    max_entries: usize,
    cache: BTreeMap<String, Vec<HistoryEntry>>,
    last_error: Option<String>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("scope", &self.scope)
            .field("max_entries", &self.max_entries)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    pub fn new(backend: Box<dyn HistoryBackend>, scope: HistoryScope, max_entries: usize) -> Self {
        Self {
            backend,
            scope,
            max_entries: max_entries.max(1),
            cache: BTreeMap::new(),
            last_error: None,
        }
    }

    pub fn in_memory(scope: HistoryScope) -> Self {
        Self::new(Box::<MemoryBackend>::default(), scope, MAX_HISTORY)
    }

    pub fn scope(&self) -> HistoryScope {
        self.scope
    }

    /// Read the durable list for `mode` into memory. Called once per view
    /// activation. On failure the in-memory list is kept.
    pub fn load(&mut self, mode: SearchMode) -> &[HistoryEntry] {
        let key = self.scope.key(mode);
        match self.backend.load(&key) {
            Ok(mut entries) => {
                entries.truncate(self.max_entries);
                self.cache.insert(key.clone(), entries);
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to load search history");
                self.last_error = Some(err.to_string());
            }
        }
        self.cache.entry(key).or_default()
    }

    /// Entries visible from `mode`, most recent first.
    pub fn entries(&self, mode: SearchMode) -> &[HistoryEntry] {
        self.cache
            .get(&self.scope.key(mode))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add(&mut self, query: &str, mode: SearchMode) {
        self.add_at(query, mode, Utc::now());
    }

    /// Insert at the front, dropping any previous entry for the same query,
    /// then trim to the retained count.
    pub fn add_at(&mut self, query: &str, mode: SearchMode, timestamp: Timestamp) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let key = self.scope.key(mode);
        let entries = self.cache.entry(key.clone()).or_default();
        entries.retain(|entry| entry.query != query);
        entries.insert(
            0,
            HistoryEntry {
                query: query.to_string(),
                mode,
                timestamp,
            },
        );
        entries.truncate(self.max_entries);
        self.persist(&key);
    }

    /// Remove every entry in the scope `mode` belongs to.
    pub fn clear(&mut self, mode: SearchMode) {
        let key = self.scope.key(mode);
        self.cache.insert(key.clone(), Vec::new());
        self.persist(&key);
    }

    /// Message of the most recent persistence failure, cleared on read.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    fn persist(&mut self, key: &str) {
        let entries = self.cache.get(key).map(Vec::as_slice).unwrap_or(&[]);
        if let Err(err) = self.backend.save(key, entries) {
            tracing::warn!(key = %key, error = %err, "failed to persist search history");
            self.last_error = Some(err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(seconds: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    struct FailingBackend;

    impl HistoryBackend for FailingBackend {
        fn load(&self, _key: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
            Err(HistoryError::Io(std::io::Error::other("disk gone")))
        }

        fn save(&mut self, _key: &str, _entries: &[HistoryEntry]) -> Result<(), HistoryError> {
            Err(HistoryError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn duplicate_moves_to_front_with_latest_timestamp() {
        let mut store = HistoryStore::in_memory(HistoryScope::PerMode);
        store.add_at("alpha", SearchMode::Keyword, at(0));
        store.add_at("beta", SearchMode::Keyword, at(1));
        store.add_at("alpha", SearchMode::Keyword, at(2));

        let entries = store.entries(SearchMode::Keyword);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].query, "alpha");
        assert_eq!(entries[0].timestamp, at(2));
        assert_eq!(entries[1].query, "beta");
    }

    #[test]
    fn eleventh_insert_evicts_oldest() {
        let mut store = HistoryStore::in_memory(HistoryScope::PerMode);
        for i in 0..11 {
            store.add_at(&format!("q{i}"), SearchMode::Keyword, at(i));
        }
        let entries = store.entries(SearchMode::Keyword);
        assert_eq!(entries.len(), MAX_HISTORY);
        assert_eq!(entries[0].query, "q10");
        assert!(entries.iter().all(|e| e.query != "q0"));
    }

    #[test]
    fn per_mode_scope_partitions_entries() {
        let mut store = HistoryStore::in_memory(HistoryScope::PerMode);
        store.add("alpha", SearchMode::Keyword);
        store.add("alpha", SearchMode::Semantic);
        assert_eq!(store.entries(SearchMode::Keyword).len(), 1);
        assert_eq!(store.entries(SearchMode::Semantic).len(), 1);
        assert!(store.entries(SearchMode::Hybrid).is_empty());
    }

    #[test]
    fn global_scope_dedupes_across_modes() {
        let mut store = HistoryStore::in_memory(HistoryScope::Global);
        store.add("alpha", SearchMode::Keyword);
        store.add("alpha", SearchMode::Hybrid);
        let entries = store.entries(SearchMode::Semantic);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mode, SearchMode::Hybrid);
    }

    #[test]
    fn blank_queries_are_ignored() {
        let mut store = HistoryStore::in_memory(HistoryScope::PerMode);
        store.add("   ", SearchMode::Keyword);
        assert!(store.entries(SearchMode::Keyword).is_empty());
    }

    #[test]
    fn clear_empties_only_the_current_scope() {
        let mut store = HistoryStore::in_memory(HistoryScope::PerMode);
        store.add("alpha", SearchMode::Keyword);
        store.add("beta", SearchMode::Hybrid);
        store.clear(SearchMode::Keyword);
        assert!(store.entries(SearchMode::Keyword).is_empty());
        assert_eq!(store.entries(SearchMode::Hybrid).len(), 1);
    }

    #[test]
    fn persistence_failure_keeps_memory_authoritative() {
        let mut store = HistoryStore::new(Box::new(FailingBackend), HistoryScope::PerMode, 10);
        store.add("alpha", SearchMode::Keyword);
        assert_eq!(store.entries(SearchMode::Keyword)[0].query, "alpha");
        assert!(store.take_error().is_some());

        let loaded = store.load(SearchMode::Keyword);
        assert_eq!(loaded.len(), 1);
        assert!(store.take_error().unwrap().contains("disk gone"));
    }
}
