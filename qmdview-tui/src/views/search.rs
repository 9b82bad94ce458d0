//! Search view: query box, mode and option pills, results with details.

use crate::state::App;
use crate::theme::{mode_color, relevance_color};
use crate::widgets::{DetailPanel, OptionBar, Pill};
use qmdview_core::{empty_suggestion, Outcome, SearchMode, SearchPhase};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    render_query(f, app, rows[0]);
    render_options(f, app, rows[1]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[2]);

    if app.orchestrator.results().is_empty() {
        render_placeholder(f, app, rows[2]);
        return;
    }
    render_results(f, app, columns[0]);
    render_detail(f, app, columns[1]);
}

fn phase_label(app: &App) -> String {
    let phase = app.orchestrator.phase();
    let label = match phase {
        SearchPhase::Idle => "Query".to_string(),
        SearchPhase::Debouncing { .. } => "Query (waiting for typing to pause)".to_string(),
        SearchPhase::PendingConfirmation => "Query (press Enter to search)".to_string(),
        SearchPhase::InFlight(_) => format!("Query (searching {}…)", app.orchestrator.mode().title()),
        SearchPhase::Settled => format!("Query ({} results)", app.orchestrator.results().len()),
    };
    // An earlier search can still be running behind an edit.
    if app.orchestrator.is_in_flight() && !matches!(phase, SearchPhase::InFlight(_)) {
        format!("{label} · previous search running")
    } else {
        label
    }
}

fn render_query(f: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default()
        .title(phase_label(app))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border_focus));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(&app.input, inner);
}

fn render_options(f: &mut Frame<'_>, app: &App, area: Rect) {
    let current = app.orchestrator.mode();
    let options = app.orchestrator.options();
    let modes = SearchMode::all().iter().map(|mode| {
        let pill = Pill::new(mode.title(), *mode == current);
        if mode.is_cheap() {
            pill
        } else {
            pill.on_confirm()
        }
    });
    let toggles = [
        Pill::new("full", options.full),
        Pill::new("line numbers", options.line_numbers),
        Pill::new("all", options.all),
    ];

    let title = format!(
        "Mode / Options | {}",
        options.collection.as_deref().unwrap_or("all collections")
    );
    OptionBar::new(
        title,
        Style::default()
            .fg(mode_color(current, &app.theme))
            .add_modifier(Modifier::REVERSED),
        Style::default().fg(app.theme.text_dim),
    )
    .group(modes)
    .group(toggles)
    .render(f, area);
}

fn render_placeholder(f: &mut Frame<'_>, app: &App, area: Rect) {
    let (text, style) = match app.orchestrator.last_outcome() {
        Some(Outcome::Empty { suggestion }) => (
            format!("No results for \"{}\".\n\n{}", app.orchestrator.query(), suggestion),
            Style::default().fg(app.theme.text_dim),
        ),
        Some(Outcome::Failed(failure)) => (
            format!("{}\n\n{}\n\nDetails are on the Status view (F4).", failure.title, failure.message),
            Style::default().fg(app.theme.error),
        ),
        _ if app.orchestrator.query().trim().is_empty() => (
            "Start typing to search your markdown collections.".to_string(),
            Style::default().fg(app.theme.text_dim),
        ),
        _ => (
            empty_suggestion(app.orchestrator.mode()).to_string(),
            Style::default().fg(app.theme.text_muted),
        ),
    };
    let paragraph = Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Results").borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_results(f: &mut Frame<'_>, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .orchestrator
        .results()
        .iter()
        .map(|result| {
            let color = relevance_color(result.relevance(), &app.theme);
            let mut spans = vec![
                Span::styled(format!("{:>4} ", result.percentage()), Style::default().fg(color)),
                Span::raw(result.display_title().to_string()),
            ];
            if let Some(collection) = &result.collection {
                spans.push(Span::styled(
                    format!("  [{collection}]"),
                    Style::default().fg(app.theme.text_dim),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default();
    state.select(app.search_view.selected);

    let list = List::new(items)
        .block(Block::default().title("Results").borders(Borders::ALL))
        .highlight_style(Style::default().bg(app.theme.bg_highlight).fg(app.theme.primary));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_detail(f: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(result) = app.selected_result() else {
        return;
    };
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(area);

    let relevance = result.relevance();
    let mut detail = DetailPanel::new("Details", Style::default().fg(app.theme.secondary))
        .styled_field(
            "Relevance",
            format!("{} ({})", relevance.label(), result.percentage()),
            Style::default().fg(relevance_color(relevance, &app.theme)),
        )
        .field("File", result.raw.file.clone())
        .field("Collection", result.collection.clone().unwrap_or_else(|| "-".to_string()))
        .field(
            "Path",
            result
                .absolute_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| result.relative_path.clone()),
        )
        .field("Doc", result.raw.docid.clone());
    if let Some(line) = result.raw.line {
        detail = detail.field("Line", line.to_string());
    }
    detail.render(f, right[0]);

    let snippet = Paragraph::new(result.raw.snippet.clone())
        .block(Block::default().title("Snippet").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(snippet, right[1]);
}
