//! History view: recent queries for the active mode.

use crate::state::App;
use crate::theme::mode_color;
use qmdview_core::HistoryScope;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let title = match app.config.search.history_scope {
        HistoryScope::PerMode => format!("History ({})", app.orchestrator.mode().title()),
        HistoryScope::Global => "History (all modes)".to_string(),
    };
    let entries = app.orchestrator.history();
    if entries.is_empty() {
        let empty = Paragraph::new("No searches yet.")
            .style(Style::default().fg(app.theme.text_dim))
            .block(Block::default().title(title).borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", entry.timestamp.format("%Y-%m-%d %H:%M")),
                    Style::default().fg(app.theme.text_dim),
                ),
                Span::styled(
                    format!("{:<8} ", entry.mode.title()),
                    Style::default().fg(mode_color(entry.mode, &app.theme)),
                ),
                Span::raw(entry.query.clone()),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(app.history_view.selected);

    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().bg(app.theme.bg_highlight).fg(app.theme.primary));
    f.render_stateful_widget(list, area, &mut state);
}
