//! Errors that end the session before or while the UI runs.
//!
//! Everything recoverable (engine failures, unreadable history or UI state,
//! a log file that cannot be opened) becomes a notification instead.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum TuiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

impl TuiError {
    /// Process exit status: 2 for bad arguments or configuration, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            TuiError::Config(_) => 2,
            TuiError::Terminal(_) => 1,
        }
    }
}
