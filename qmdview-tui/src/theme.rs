//! Color palette and semantic color helpers.

use crate::notifications::NotificationLevel;
use qmdview_core::{Relevance, SearchMode};
use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub bg_highlight: Color,
    pub primary: Color,
    pub primary_dim: Color,
    pub secondary: Color,
    pub tertiary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_dim: Color,
    pub text_muted: Color,
    pub border: Color,
    pub border_focus: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg_highlight: Color::Rgb(42, 42, 42),
            primary: Color::Rgb(0, 255, 255),
            primary_dim: Color::Rgb(0, 136, 136),
            secondary: Color::Rgb(255, 0, 255),
            tertiary: Color::Rgb(255, 255, 0),
            success: Color::Rgb(0, 255, 0),
            warning: Color::Rgb(255, 255, 0),
            error: Color::Rgb(255, 0, 0),
            info: Color::Rgb(0, 255, 255),
            text: Color::Rgb(255, 255, 255),
            text_dim: Color::Rgb(136, 136, 136),
            text_muted: Color::Rgb(68, 68, 68),
            border: Color::Rgb(68, 68, 68),
            border_focus: Color::Rgb(0, 255, 255),
        }
    }
}

/// Green / yellow / gray by relevance tier.
pub fn relevance_color(relevance: Relevance, theme: &Theme) -> Color {
    match relevance {
        Relevance::High => theme.success,
        Relevance::Medium => theme.warning,
        Relevance::Low => theme.text_dim,
    }
}

pub fn mode_color(mode: SearchMode, theme: &Theme) -> Color {
    match mode {
        SearchMode::Keyword => theme.primary,
        SearchMode::Semantic => theme.secondary,
        SearchMode::Hybrid => theme.tertiary,
    }
}

pub fn notification_color(level: NotificationLevel, theme: &Theme) -> Color {
    match level {
        NotificationLevel::Info => theme.info,
        NotificationLevel::Warning => theme.warning,
        NotificationLevel::Error => theme.error,
        NotificationLevel::Success => theme.success,
    }
}

/// Embedding coverage: red while mostly unembedded, green once complete.
pub fn coverage_color(percent: f64, theme: &Theme) -> Color {
    if percent >= 100.0 {
        theme.success
    } else if percent >= 70.0 {
        theme.warning
    } else {
        theme.error
    }
}
