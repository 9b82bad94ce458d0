//! qmdview entry point.

use crossterm::{
    event::{self, Event as CrosstermEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use qmdview_core::{
    CollectionRegistry, DependencyCheck, EmbedEvent, EngineLocator, IndexingMonitor,
    IndexingState, Orchestrator, QmdClient, SearchDriver, SearchMode,
};
use qmdview_tui::config::{LaunchArgs, LaunchCommand, TuiConfig};
use qmdview_tui::error::TuiError;
use qmdview_tui::events::{Refresh, TuiEvent};
use qmdview_tui::keys::{map_key, Action};
use qmdview_tui::logging;
use qmdview_tui::nav::View;
use qmdview_tui::notifications::NotificationLevel;
use qmdview_tui::persistence::UiStateStore;
use qmdview_tui::state::App;
use qmdview_tui::views::render_view;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "qmdview exited with an error");
            eprintln!("qmdview: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run() -> Result<(), TuiError> {
    let args = LaunchArgs::from_env()?;
    let config = TuiConfig::load(args.config.as_deref())?;

    let mut startup_warnings = Vec::new();
    if let Err(err) = logging::init(&config.ui.log_path) {
        startup_warnings.push(format!("Logging disabled: {err}"));
    }

    let readiness = EngineLocator::new(config.engine_config()).status();
    if !readiness.is_ready() {
        tracing::warn!(missing = ?readiness.missing, "engine not available");
    }
    let client = QmdClient::from_config(&config.engine_config());

    let registry = match &config.engine.index_config {
        Some(path) => CollectionRegistry::load_index_config(path).unwrap_or_else(|err| {
            startup_warnings.push(format!("Could not read {}: {err}", path.display()));
            CollectionRegistry::default()
        }),
        None => CollectionRegistry::default(),
    };

    let now = Instant::now();
    let orchestrator = Orchestrator::new(
        SearchMode::Keyword,
        Arc::new(registry),
        config.history_store(),
        config.orchestrator_settings(),
    )
    .with_options(config.search_options());

    let indexing = IndexingState::new();
    let mut app = App::new(config, orchestrator, readiness, indexing.clone());
    for warning in startup_warnings {
        app.notify(NotificationLevel::Warning, warning);
    }

    let ui_state = UiStateStore::new(app.config.ui.state_path.clone());
    if let Some(state) = ui_state.load_or_skip() {
        app.restore(state, now);
    }
    match args.command {
        Some(LaunchCommand::Search(mode)) => {
            app.orchestrator.set_mode(mode, now);
            app.active_view = View::Search;
        }
        Some(LaunchCommand::Status) => app.active_view = View::Status,
        None => {}
    }

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard;

    let (driver, mut completions) = SearchDriver::new(client);
    let (event_tx, mut event_rx) = mpsc::channel::<TuiEvent>(256);
    spawn_input_reader(event_tx.clone());

    let mut indexing_rx =
        IndexingMonitor::new(indexing, app.config.indexing_poll_interval()).spawn();

    if app.readiness.is_ready() {
        spawn_refresh(driver.client().clone(), event_tx.clone());
    }

    loop {
        terminal.draw(|f| render_view(f, &app))?;

        let deadline = app.orchestrator.deadline();
        tokio::select! {
            Some(event) = event_rx.recv() => {
                if handle_event(&mut app, &driver, &event_tx, event) {
                    break;
                }
            }
            Some(completion) = completions.recv() => {
                let outcome = app.orchestrator.complete(completion.id, completion.result);
                app.apply_outcome(outcome);
            }
            Ok(()) = indexing_rx.changed() => {
                app.status_view.indexing_active = *indexing_rx.borrow();
            }
            _ = wait_for(deadline) => {
                if let Some(dispatch) = app.orchestrator.poll(Instant::now()) {
                    driver.dispatch(dispatch);
                }
            }
        }
    }

    app.stop_embed();
    if let Err(err) = ui_state.save(&app.persisted_state()) {
        tracing::warn!(error = %err, "could not save UI state");
    }

    Ok(())
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

fn spawn_input_reader(sender: mpsc::Sender<TuiEvent>) {
    std::thread::spawn(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(200)) {
            let sent = match event::read() {
                Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    sender.blocking_send(TuiEvent::Input(key))
                }
                Ok(CrosstermEvent::Resize(width, height)) => {
                    sender.blocking_send(TuiEvent::Resize { width, height })
                }
                _ => Ok(()),
            };
            if sent.is_err() {
                break;
            }
        }
    });
}

/// Fetch collections, contexts and index status together.
fn spawn_refresh(client: QmdClient, sender: mpsc::Sender<TuiEvent>) {
    tokio::spawn(async move {
        let (collections, contexts, status) =
            tokio::join!(client.collections(), client.contexts(), client.status());
        let refresh = Refresh {
            collections,
            contexts,
            status,
        };
        let _ = sender.send(TuiEvent::Refreshed(Box::new(refresh))).await;
    });
}

fn forward_embed(job: u64, mut events: mpsc::Receiver<EmbedEvent>, sender: mpsc::Sender<TuiEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if sender.send(TuiEvent::Embed { job, event }).await.is_err() {
                break;
            }
        }
    });
}

/// Returns true when the app should exit.
fn handle_event(
    app: &mut App,
    driver: &SearchDriver,
    sender: &mpsc::Sender<TuiEvent>,
    event: TuiEvent,
) -> bool {
    match event {
        TuiEvent::Input(key) => return handle_action(app, driver, sender, map_key(key)),
        TuiEvent::Embed { job, event } => {
            if app.apply_embed_event(job, event) {
                spawn_refresh(driver.client().clone(), sender.clone());
            }
        }
        TuiEvent::Refreshed(refresh) => app.apply_refresh(*refresh),
        TuiEvent::Resize { .. } => {}
    }
    false
}

fn handle_action(
    app: &mut App,
    driver: &SearchDriver,
    sender: &mpsc::Sender<TuiEvent>,
    action: Action,
) -> bool {
    let now = Instant::now();
    match action {
        Action::Quit => return true,
        Action::SwitchView(index) => {
            if let Some(view) = View::from_index(index) {
                app.active_view = view;
            }
        }
        Action::MoveUp => app.move_selection(false),
        Action::MoveDown => app.move_selection(true),
        Action::Confirm => {
            if let Some(dispatch) = app.confirm(now) {
                driver.dispatch(dispatch);
            }
        }
        Action::CycleMode => app.cycle_mode(now),
        Action::CycleCollection => app.cycle_collection(now),
        Action::Toggle(toggle) => app.toggle(toggle, now),
        Action::StartEmbed => {
            if let Some((job, events)) = app.start_embed(driver.client(), false) {
                forward_embed(job, events, sender.clone());
            }
        }
        Action::KillEmbed => {
            if app.kill_embed() {
                spawn_refresh(driver.client().clone(), sender.clone());
            }
        }
        Action::ClearHistory => app.clear_history(),
        Action::ClearQuery => app.clear_query(now),
        Action::Refresh => {
            if app.readiness.is_ready() {
                spawn_refresh(driver.client().clone(), sender.clone());
            }
        }
        Action::Edit(key) => app.edit(key, now),
    }
    false
}
