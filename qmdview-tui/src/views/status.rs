//! Status view: index health, embedding coverage and the embed log.

use crate::state::App;
use crate::theme::coverage_color;
use crate::widgets::{ActivityIndicator, DetailPanel, ProgressBar};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let view = &app.status_view;
    match &view.status {
        Some(status) => {
            DetailPanel::new("Index", Style::default().fg(app.theme.secondary))
                .field("Path", status.index_path.clone())
                .field("Size", status.index_size.clone())
                .field("Documents", status.total_documents.to_string())
                .field("Pending", status.pending_embeddings.to_string())
                .field("Collections", status.collections.join(", "))
                .render(f, rows[0]);

            let percent = status.embedded_ratio() * 100.0;
            ProgressBar {
                title: "Embedded".to_string(),
                value: status.embedded_documents as f64,
                max: status.total_documents as f64,
                style: Style::default().fg(coverage_color(percent, &app.theme)),
            }
            .render(f, rows[1]);
        }
        None => {
            let loading = Paragraph::new("Index status not loaded. Press ^R to refresh.")
                .style(Style::default().fg(app.theme.text_dim))
                .block(Block::default().title("Index").borders(Borders::ALL));
            f.render_widget(loading, rows[0]);
        }
    }

    let message = if view.indexing_active {
        "Embedding in progress. Semantic and Hybrid results may be incomplete."
    } else {
        "Idle"
    };
    ActivityIndicator {
        title: "Indexing",
        active: view.indexing_active,
        message,
        active_style: Style::default().fg(app.theme.warning),
        idle_style: Style::default().fg(app.theme.text_dim),
    }
    .render(f, rows[2]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[3]);

    let visible = bottom[0].height.saturating_sub(2) as usize;
    let skip = view.embed_log.len().saturating_sub(visible);
    let log: Vec<ListItem> = view
        .embed_log
        .iter()
        .skip(skip)
        .map(|line| ListItem::new(line.clone()))
        .collect();
    f.render_widget(
        List::new(log).block(Block::default().title("Embed log").borders(Borders::ALL)),
        bottom[0],
    );

    let detail = Paragraph::new(view.last_detail.clone().unwrap_or_default())
        .style(Style::default().fg(app.theme.text_dim))
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Last failure").borders(Borders::ALL));
    f.render_widget(detail, bottom[1]);
}
