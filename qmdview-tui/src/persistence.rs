//! UI state carried between sessions: the open view, the search mode and
//! the collection filter. Losing this file only costs the user a few key
//! presses, so an unreadable file is reported and then treated as absent.

use crate::nav::View;
use chrono::{DateTime, Utc};
use qmdview_core::SearchMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub active_view: View,
    pub mode: SearchMode,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not valid UI state: {source}", path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// JSON file holding one [`PersistedState`].
#[derive(Debug, Clone)]
pub struct UiStateStore {
    path: PathBuf,
}

impl UiStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| PersistenceError::Format {
                path: self.path.clone(),
                source,
            })
    }

    /// Like [`UiStateStore::load`], logging and dropping any failure.
    pub fn load_or_skip(&self) -> Option<PersistedState> {
        self.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable UI state");
            None
        })
    }

    /// Stamp and write `state`. The file is replaced in one rename so an
    /// interrupted exit never leaves half a document behind.
    pub fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let write_error = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let stamped = PersistedState {
            saved_at: Some(Utc::now()),
            ..state.clone()
        };
        let contents =
            serde_json::to_string_pretty(&stamped).map_err(|source| PersistenceError::Format {
                path: self.path.clone(),
                source,
            })?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, contents).map_err(write_error)?;
        std::fs::rename(&staging, &self.path).map_err(write_error)?;
        tracing::debug!(path = %self.path.display(), "saved UI state");
        Ok(())
    }
}
