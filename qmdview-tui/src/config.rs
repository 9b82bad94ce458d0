//! Configuration loading for the qmdview TUI.
//!
//! Every section is optional; a missing file path means built-in defaults.
//! Unknown keys are rejected so typos surface instead of being ignored.

use qmdview_core::{
    EngineConfig, HistoryScope, HistoryStore, JsonFileBackend, OptionRefresh,
    OrchestratorSettings, SearchMode, SearchOptions,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TuiConfig {
    pub engine: EngineSection,
    pub search: SearchSection,
    pub history: HistorySection,
    pub ui: UiSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineSection {
    pub binary: PathBuf,
    /// Appended to `PATH`, in order, when running the engine.
    pub extra_paths: Vec<PathBuf>,
    pub timeout_ms: u64,
    pub embed_timeout_ms: u64,
    /// The engine's YAML collection file, used to resolve result paths.
    pub index_config: Option<PathBuf>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("qmd"),
            extra_paths: Vec::new(),
            timeout_ms: 30_000,
            embed_timeout_ms: 300_000,
            index_config: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SearchSection {
    pub debounce_ms: u64,
    pub result_limit: u32,
    pub min_score: Option<f64>,
    pub history_scope: HistoryScope,
    pub option_refresh: OptionRefresh,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            result_limit: 20,
            min_score: None,
            history_scope: HistoryScope::PerMode,
            option_refresh: OptionRefresh::CheapModeOnly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HistorySection {
    pub path: PathBuf,
    pub max_entries: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            path: data_dir().join("history.json"),
            max_entries: qmdview_core::MAX_HISTORY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UiSection {
    pub state_path: PathBuf,
    pub log_path: PathBuf,
    pub indexing_poll_ms: u64,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            state_path: data_dir().join("ui-state.json"),
            log_path: data_dir().join("qmdview.log"),
            indexing_poll_ms: 1_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl TuiConfig {
    /// Load from `path`, or from `QMDVIEW_CONFIG`, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(config_path_from_env);
        let config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.binary.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.binary",
                reason: "must not be empty".to_string(),
            });
        }
        if self.engine.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.engine.embed_timeout_ms < self.engine.timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "engine.embed_timeout_ms",
                reason: "must be >= engine.timeout_ms".to_string(),
            });
        }
        if self.search.debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.debounce_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.search.result_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.result_limit",
                reason: "must be > 0".to_string(),
            });
        }
        if let Some(min_score) = self.search.min_score {
            if !(0.0..=1.0).contains(&min_score) {
                return Err(ConfigError::InvalidValue {
                    field: "search.min_score",
                    reason: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }
        if self.history.max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history.max_entries",
                reason: "must be > 0".to_string(),
            });
        }
        if self.history.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "history.path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.ui.state_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ui.state_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.ui.log_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ui.log_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.ui.indexing_poll_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ui.indexing_poll_ms",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            binary: self.engine.binary.clone(),
            extra_paths: self.engine.extra_paths.clone(),
            timeout: Duration::from_millis(self.engine.timeout_ms),
            embed_timeout: Duration::from_millis(self.engine.embed_timeout_ms),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            debounce: Duration::from_millis(self.search.debounce_ms),
            option_refresh: self.search.option_refresh,
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            limit: self.search.result_limit,
            min_score: self.search.min_score,
            ..SearchOptions::default()
        }
    }

    pub fn history_store(&self) -> HistoryStore {
        HistoryStore::new(
            Box::new(JsonFileBackend::new(&self.history.path)),
            self.search.history_scope,
            self.history.max_entries,
        )
    }

    pub fn indexing_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ui.indexing_poll_ms)
    }
}

/// What the binary was asked to open with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchCommand {
    /// Search view in a fixed initial mode.
    Search(SearchMode),
    Status,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchArgs {
    pub config: Option<PathBuf>,
    pub command: Option<LaunchCommand>,
}

impl LaunchArgs {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(std::env::args().skip(1))
    }

    /// `[--config <path>] [search|vsearch|query|status]`
    pub fn parse<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut launch = LaunchArgs::default();
        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            if arg == "--config" {
                let path = args.next().ok_or_else(|| {
                    ConfigError::InvalidArgument("--config requires a path".to_string())
                })?;
                launch.config = Some(PathBuf::from(path));
                continue;
            }
            let command = match arg.as_str() {
                "status" => LaunchCommand::Status,
                other => SearchMode::from_subcommand(other)
                    .map(LaunchCommand::Search)
                    .ok_or_else(|| ConfigError::InvalidArgument(format!("unknown command `{other}`")))?,
            };
            if launch.command.replace(command).is_some() {
                return Err(ConfigError::InvalidArgument(
                    "only one command may be given".to_string(),
                ));
            }
        }
        Ok(launch)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("QMDVIEW_CONFIG").ok().map(PathBuf::from)
}

/// `$XDG_STATE_HOME/qmdview`, else `~/.local/state/qmdview`.
fn data_dir() -> PathBuf {
    if let Some(state) = std::env::var_os("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(state).join("qmdview");
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".local/state/qmdview"),
        None => PathBuf::from(".qmdview"),
    }
}
