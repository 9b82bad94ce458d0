//! Notification system for the TUI.

use chrono::{DateTime, Utc};
use qmdview_core::SearchFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl NotificationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "INFO",
            NotificationLevel::Warning => "WARN",
            NotificationLevel::Error => "ERROR",
            NotificationLevel::Success => "OK",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Engine diagnostics or raw output, shown on the Status view for copying.
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn from_failure(failure: &SearchFailure) -> Self {
        let notification = Self::new(
            NotificationLevel::Error,
            format!("{}: {}", failure.title, failure.message),
        );
        match (&failure.diagnostics, &failure.raw_output) {
            (Some(diagnostics), Some(raw)) => {
                notification.with_detail(format!("{diagnostics}\n--- output ---\n{raw}"))
            }
            (Some(detail), None) | (None, Some(detail)) => notification.with_detail(detail.clone()),
            (None, None) => notification,
        }
    }
}
