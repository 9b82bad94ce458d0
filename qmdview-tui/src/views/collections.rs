//! Collections view: indexed collections and their contexts.

use crate::state::App;
use crate::widgets::DetailPanel;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let view = &app.collections_view;
    let active = app.orchestrator.options().collection.as_deref();
    let items: Vec<ListItem> = view
        .collections
        .iter()
        .map(|collection| {
            let marker = if Some(collection.name.as_str()) == active { "● " } else { "  " };
            let style = if collection.exists {
                Style::default().fg(app.theme.text)
            } else {
                Style::default().fg(app.theme.error)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(app.theme.primary)),
                Span::styled(collection.name.clone(), style),
                Span::styled(
                    format!("  {} docs", collection.documents),
                    Style::default().fg(app.theme.text_dim),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(view.selected);
    let list = List::new(items)
        .block(Block::default().title("Collections").borders(Borders::ALL))
        .highlight_style(Style::default().bg(app.theme.bg_highlight).fg(app.theme.primary));
    f.render_stateful_widget(list, chunks[0], &mut state);

    let Some(collection) = view.selected_collection() else {
        let hint = Paragraph::new("Select a collection and press Enter to search only it.")
            .style(Style::default().fg(app.theme.text_dim))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Details").borders(Borders::ALL));
        f.render_widget(hint, chunks[1]);
        return;
    };

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(chunks[1]);

    let root_style = if collection.exists {
        Style::default()
    } else {
        Style::default().fg(app.theme.error)
    };
    let root = if collection.root.as_os_str().is_empty() {
        "unknown".to_string()
    } else if collection.exists {
        collection.root.display().to_string()
    } else {
        format!("{} (missing)", collection.root.display())
    };
    DetailPanel::new(&collection.name, Style::default().fg(app.theme.secondary))
        .styled_field("Root", root, root_style)
        .field("Pattern", collection.mask.clone())
        .field("Documents", collection.documents.to_string())
        .field("Embedded", collection.embedded.to_string())
        .render(f, right[0]);

    let contexts: Vec<ListItem> = view
        .contexts_for(&collection.name)
        .map(|context| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", context.path),
                    Style::default().fg(app.theme.primary_dim),
                ),
                Span::raw(context.description.clone()),
            ]))
        })
        .collect();
    let contexts = List::new(contexts)
        .block(Block::default().title("Contexts").borders(Borders::ALL));
    f.render_widget(contexts, right[1]);
}
