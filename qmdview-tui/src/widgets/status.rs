//! Boxed one-line indicator for background activity.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// A lit or unlit marker followed by a message.
pub struct ActivityIndicator<'a> {
    pub title: &'a str,
    pub active: bool,
    pub message: &'a str,
    pub active_style: Style,
    pub idle_style: Style,
}

impl ActivityIndicator<'_> {
    pub fn line(&self) -> Line<'static> {
        let (marker, style) = if self.active {
            ("● ", self.active_style)
        } else {
            ("○ ", self.idle_style)
        };
        Line::from(vec![
            Span::styled(marker, style),
            Span::styled(self.message.to_string(), style),
        ])
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let paragraph = Paragraph::new(self.line())
            .wrap(Wrap { trim: true })
            .block(Block::default().title(self.title).borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    #[test]
    fn marker_follows_activity() {
        let mut indicator = ActivityIndicator {
            title: "Indexing",
            active: true,
            message: "embedding",
            active_style: Style::default().fg(Color::Yellow),
            idle_style: Style::default().fg(Color::DarkGray),
        };
        let lit = indicator.line();
        assert_eq!(lit.spans[0].content, "● ");
        assert_eq!(lit.spans[1].style.fg, Some(Color::Yellow));

        indicator.active = false;
        assert_eq!(indicator.line().spans[0].content, "○ ");
    }
}
