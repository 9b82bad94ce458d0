//! Mode and option selector drawn as groups of pills on one line.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const GROUP_SEPARATOR: &str = " │ ";

/// One selectable label. `needs_confirm` marks modes that only run on Enter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pill {
    pub label: String,
    pub active: bool,
    pub needs_confirm: bool,
}

impl Pill {
    pub fn new(label: impl Into<String>, active: bool) -> Self {
        Self {
            label: label.into(),
            active,
            needs_confirm: false,
        }
    }

    pub fn on_confirm(mut self) -> Self {
        self.needs_confirm = true;
        self
    }

    fn text(&self) -> String {
        if self.needs_confirm {
            format!(" {} ⏎ ", self.label)
        } else {
            format!(" {} ", self.label)
        }
    }
}

pub struct OptionBar {
    title: String,
    groups: Vec<Vec<Pill>>,
    active_style: Style,
    inactive_style: Style,
}

impl OptionBar {
    pub fn new(title: impl Into<String>, active_style: Style, inactive_style: Style) -> Self {
        Self {
            title: title.into(),
            groups: Vec::new(),
            active_style,
            inactive_style,
        }
    }

    /// Empty groups are skipped so no separator dangles.
    pub fn group(mut self, pills: impl IntoIterator<Item = Pill>) -> Self {
        let pills: Vec<Pill> = pills.into_iter().collect();
        if !pills.is_empty() {
            self.groups.push(pills);
        }
        self
    }

    pub fn line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (index, group) in self.groups.iter().enumerate() {
            if index > 0 {
                spans.push(Span::styled(GROUP_SEPARATOR, self.inactive_style));
            }
            spans.extend(group.iter().map(|pill| {
                let style = if pill.active {
                    self.active_style
                } else {
                    self.inactive_style
                };
                Span::styled(pill.text(), style)
            }));
        }
        Line::from(spans)
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(self.title.as_str())
            .borders(Borders::ALL);
        f.render_widget(Paragraph::new(self.line()).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Modifier};

    #[test]
    fn groups_are_separated_and_active_pills_styled() {
        let active = Style::default().add_modifier(Modifier::REVERSED);
        let inactive = Style::default().fg(Color::DarkGray);
        let bar = OptionBar::new("Mode", active, inactive)
            .group([Pill::new("Keyword", true), Pill::new("Hybrid", false).on_confirm()])
            .group(Vec::new())
            .group([Pill::new("full", false)]);

        let line = bar.line();
        let text: Vec<&str> = line.spans.iter().map(|span| span.content.as_ref()).collect();
        assert_eq!(text, vec![" Keyword ", " Hybrid ⏎ ", GROUP_SEPARATOR, " full "]);
        assert_eq!(line.spans[0].style, active);
        assert_eq!(line.spans[1].style, inactive);
    }
}
