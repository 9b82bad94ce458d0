//! View rendering dispatch.

pub mod collections;
pub mod history;
pub mod search;
pub mod status;

use crate::nav::View;
use chrono::{Duration, Utc};
use crate::state::App;
use crate::theme::{mode_color, notification_color};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

/// How long a notification replaces the key help.
const NOTIFICATION_SECS: i64 = 8;

pub fn render_view(f: &mut Frame<'_>, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, layout[0]);

    if !app.readiness.is_ready() {
        render_setup_guide(f, app, layout[1]);
    } else {
        match app.active_view {
            View::Search => search::render(f, app, layout[1]),
            View::History => history::render(f, app, layout[1]),
            View::Collections => collections::render(f, app, layout[1]),
            View::Status => status::render(f, app, layout[1]),
        }
    }

    render_footer(f, app, layout[2]);
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let mode = app.orchestrator.mode();
    let collection = app
        .orchestrator
        .options()
        .collection
        .as_deref()
        .unwrap_or("all collections");
    let mut title = vec![
        Span::styled("QMDVIEW", Style::default().fg(app.theme.primary)),
        Span::raw(" | "),
        Span::styled(mode.title(), Style::default().fg(mode_color(mode, &app.theme))),
        Span::raw(" | "),
        Span::raw(collection.to_string()),
    ];
    if app.status_view.indexing_active {
        title.push(Span::raw(" | "));
        title.push(Span::styled(
            "INDEXING",
            Style::default()
                .fg(app.theme.warning)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let titles: Vec<Line> = View::all()
        .iter()
        .enumerate()
        .map(|(i, view)| Line::from(format!("F{} {}", i + 1, view.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.active_view.index())
        .style(Style::default().fg(app.theme.text_dim))
        .highlight_style(Style::default().fg(app.theme.primary))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title(Line::from(title)),
        );
    f.render_widget(tabs, area);
}

/// Shown instead of every view while a dependency is missing.
fn render_setup_guide(f: &mut Frame<'_>, app: &App, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "qmd is not available",
            Style::default()
                .fg(app.theme.error)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for missing in &app.readiness.missing {
        lines.push(Line::from(format!("  • {missing}")));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(
        "Install qmd (bun install -g github:tobi/qmd), or point engine.binary at it",
    ));
    lines.push(Line::from(
        "in the config file, then restart. Searches are held until the engine is found.",
    ));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Setup")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.error)),
        );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let help = match app.active_view {
        View::Search => "type to search • Enter run • Tab mode • ^F collection • ^O/^L/^A options • Esc quit",
        View::History => "↑/↓ select • Enter re-run • ^D clear history • Esc quit",
        View::Collections => "↑/↓ select • Enter filter search • ^R refresh • Esc quit",
        View::Status => "^E embed • ^K stop embed • ^R refresh • Esc quit",
    };
    let recent = app
        .notifications
        .last()
        .filter(|note| Utc::now() - note.created_at < Duration::seconds(NOTIFICATION_SECS));
    let (text, style) = match recent {
        Some(note) => (
            format!("{}: {}", note.level.label(), note.message),
            Style::default().fg(notification_color(note.level, &app.theme)),
        ),
        None => (help.to_string(), Style::default().fg(app.theme.text_dim)),
    };
    let footer = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .style(style);
    f.render_widget(footer, area);
}
