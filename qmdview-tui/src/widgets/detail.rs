//! Labelled field/value panel.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub struct DetailPanel<'a> {
    pub title: &'a str,
    /// Label, value and an optional style for the value.
    pub fields: Vec<(&'a str, String, Option<Style>)>,
    pub label_style: Style,
}

impl<'a> DetailPanel<'a> {
    pub fn new(title: &'a str, label_style: Style) -> Self {
        Self {
            title,
            fields: Vec::new(),
            label_style,
        }
    }

    pub fn field(mut self, label: &'a str, value: impl Into<String>) -> Self {
        self.fields.push((label, value.into(), None));
        self
    }

    pub fn styled_field(mut self, label: &'a str, value: impl Into<String>, style: Style) -> Self {
        self.fields.push((label, value.into(), Some(style)));
        self
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let lines: Vec<Line> = self
            .fields
            .iter()
            .map(|(label, value, style)| {
                Line::from(vec![
                    Span::styled(format!("{label}: "), self.label_style),
                    Span::styled(value.clone(), style.unwrap_or_default()),
                ])
            })
            .collect();

        let widget = Paragraph::new(Text::from(lines))
            .block(Block::default().title(self.title).borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        f.render_widget(widget, area);
    }
}
