//! Readiness: is the engine installed where we can run it?

use crate::process::{locate_binary, EngineConfig};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadinessStatus {
    /// Resolved engine binary.
    pub engine: Option<PathBuf>,
    /// Human-readable names of missing requirements.
    pub missing: Vec<String>,
}

impl ReadinessStatus {
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Gate consulted before any search is dispatched.
pub trait DependencyCheck: Send + Sync {
    fn status(&self) -> ReadinessStatus;

    fn is_ready(&self) -> bool {
        self.status().is_ready()
    }
}

/// Looks for the engine binary on the augmented search path.
#[derive(Debug, Clone)]
pub struct EngineLocator {
    config: EngineConfig,
}

impl EngineLocator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl DependencyCheck for EngineLocator {
    fn status(&self) -> ReadinessStatus {
        let engine = locate_binary(&self.config.binary, &self.config.search_path());
        let missing = match engine {
            Some(_) => Vec::new(),
            None => vec![format!(
                "qmd engine `{}` was not found on PATH or in the configured extra paths",
                self.config.binary.display()
            )],
        };
        ReadinessStatus { engine, missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_engine_is_not_ready() {
        let locator = EngineLocator::new(EngineConfig {
            binary: PathBuf::from("/definitely/not/qmd"),
            ..EngineConfig::default()
        });
        let status = locator.status();
        assert!(!status.is_ready());
        assert_eq!(status.engine, None);
        assert!(status.missing[0].contains("/definitely/not/qmd"));
    }

    #[test]
    fn engine_found_in_extra_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("qmd-located"), b"").unwrap();

        let locator = EngineLocator::new(EngineConfig {
            binary: PathBuf::from("qmd-located"),
            extra_paths: vec![dir.path().to_path_buf()],
            ..EngineConfig::default()
        });
        assert!(locator.is_ready());
        assert_eq!(locator.status().engine, Some(dir.path().join("qmd-located")));
    }
}
