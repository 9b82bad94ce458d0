//! Collection registry: collection name → root directory.
//!
//! Built from `collection list` records or from the engine's own YAML
//! index configuration. Read-only to the orchestrator and enricher.

use crate::error::RegistryError;
use crate::types::Collection;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionRegistry {
    collections: BTreeMap<String, Collection>,
}

#[derive(Debug, Deserialize)]
struct IndexConfig {
    #[serde(default)]
    collections: BTreeMap<String, IndexCollection>,
}

#[derive(Debug, Deserialize)]
struct IndexCollection {
    path: String,
    #[serde(default, alias = "mask", alias = "glob")]
    pattern: Option<String>,
}

impl CollectionRegistry {
    /// Build from parsed records. Existence flags are refreshed from disk.
    pub fn from_collections(collections: impl IntoIterator<Item = Collection>) -> Self {
        let collections = collections
            .into_iter()
            .map(|mut collection| {
                collection.exists =
                    !collection.root.as_os_str().is_empty() && collection.root.is_dir();
                (collection.name.clone(), collection)
            })
            .collect();
        Self { collections }
    }

    /// Read the engine's YAML index configuration
    /// (`collections: { <name>: { path, pattern } }`).
    pub fn load_index_config(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_index_yaml(&contents)
    }

    pub fn from_index_yaml(contents: &str) -> Result<Self, RegistryError> {
        let config: IndexConfig = serde_yaml::from_str(contents)?;
        Ok(Self::from_collections(config.collections.into_iter().map(
            |(name, entry)| Collection {
                name,
                root: expand_home(&entry.path),
                mask: entry.pattern.unwrap_or_else(|| "**/*.md".to_string()),
                ..Collection::default()
            },
        )))
    }

    /// Overlay `other`: its counts always win, its root wins only when
    /// this registry has none for that collection.
    pub fn merge(&mut self, other: CollectionRegistry) {
        for (name, incoming) in other.collections {
            match self.collections.get_mut(&name) {
                Some(existing) => {
                    existing.documents = incoming.documents;
                    existing.embedded = incoming.embedded;
                    if existing.root.as_os_str().is_empty() {
                        existing.root = incoming.root;
                        existing.exists = incoming.exists;
                    }
                    if existing.mask.is_empty() {
                        existing.mask = incoming.mask;
                    }
                }
                None => {
                    self.collections.insert(name, incoming);
                }
            }
        }
    }

    /// Root directory of a known collection with a recorded root.
    pub fn root(&self, name: &str) -> Option<&Path> {
        self.collections
            .get(name)
            .map(|collection| collection.root.as_path())
            .filter(|root| !root.as_os_str().is_empty())
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
