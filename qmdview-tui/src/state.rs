//! Application state and view state definitions.

use crate::config::TuiConfig;
use crate::events::Refresh;
use crate::keys::OptionToggle;
use crate::nav::View;
use crate::notifications::{Notification, NotificationLevel};
use crate::persistence::PersistedState;
use crate::theme::Theme;
use crossterm::event::KeyEvent;
use qmdview_core::{
    Collection, CollectionRegistry, ContextEntry, Dispatch, EmbedError, EmbedEvent, EmbedHandle,
    EmbedJob, EnrichedResult, HistoryEntry, IndexStatus, IndexingState, Orchestrator, Outcome,
    QmdClient, ReadinessStatus,
};
use ratatui::style::Style;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tui_textarea::{CursorMove, TextArea};

const MAX_NOTIFICATIONS: usize = 50;
const MAX_EMBED_LOG: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct SearchViewState {
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryViewState {
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionsViewState {
    pub collections: Vec<Collection>,
    pub contexts: Vec<ContextEntry>,
    pub selected: Option<usize>,
}

impl CollectionsViewState {
    pub fn selected_collection(&self) -> Option<&Collection> {
        self.selected.and_then(|i| self.collections.get(i))
    }

    pub fn contexts_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ContextEntry> {
        self.contexts.iter().filter(move |c| c.collection == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusViewState {
    pub status: Option<IndexStatus>,
    pub indexing_active: bool,
    pub embed_log: VecDeque<String>,
    /// Diagnostics attached to the most recent failure.
    pub last_detail: Option<String>,
}

pub struct App {
    pub config: TuiConfig,
    pub theme: Theme,
    pub active_view: View,
    pub input: TextArea<'static>,
    pub orchestrator: Orchestrator,
    pub readiness: ReadinessStatus,
    pub indexing: IndexingState,

    pub search_view: SearchViewState,
    pub history_view: HistoryViewState,
    pub collections_view: CollectionsViewState,
    pub status_view: StatusViewState,

    pub notifications: Vec<Notification>,

    embed: Option<(u64, EmbedHandle)>,
    embed_jobs: u64,
}

impl App {
    pub fn new(
        config: TuiConfig,
        mut orchestrator: Orchestrator,
        readiness: ReadinessStatus,
        indexing: IndexingState,
    ) -> Self {
        orchestrator.set_ready(readiness.is_ready());
        let collections = orchestrator.registry().iter().cloned().collect();
        Self {
            config,
            theme: Theme::default(),
            active_view: View::Search,
            input: query_input(""),
            orchestrator,
            readiness,
            indexing,
            search_view: SearchViewState::default(),
            history_view: HistoryViewState::default(),
            collections_view: CollectionsViewState {
                collections,
                ..CollectionsViewState::default()
            },
            status_view: StatusViewState::default(),
            notifications: Vec::new(),
            embed: None,
            embed_jobs: 0,
        }
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.push_notification(Notification::new(level, message));
    }

    fn push_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
        if self.notifications.len() > MAX_NOTIFICATIONS {
            let excess = self.notifications.len() - MAX_NOTIFICATIONS;
            self.notifications.drain(..excess);
        }
    }

    pub fn query_text(&self) -> String {
        self.input.lines().first().cloned().unwrap_or_default()
    }

    /// Forward a key to the query box. Only the Search view takes text.
    pub fn edit(&mut self, key: KeyEvent, now: Instant) {
        if self.active_view != View::Search {
            return;
        }
        if self.input.input(key) {
            let text = self.query_text();
            self.orchestrator.set_query(&text, now);
        }
    }

    pub fn clear_query(&mut self, now: Instant) {
        self.input = query_input("");
        self.orchestrator.set_query("", now);
        self.search_view.selected = None;
    }

    /// Enter: search on the Search view, re-run on History, filter on
    /// Collections.
    pub fn confirm(&mut self, now: Instant) -> Option<Dispatch> {
        match self.active_view {
            View::Search => self.orchestrator.confirm(now),
            View::History => {
                let entry = self.selected_history()?.clone();
                self.input = query_input(&entry.query);
                self.active_view = View::Search;
                self.search_view.selected = None;
                self.orchestrator.recall(&entry, now)
            }
            View::Collections => {
                let name = self.collections_view.selected_collection()?.name.clone();
                self.orchestrator.set_collection_filter(Some(name), now);
                self.active_view = View::Search;
                None
            }
            View::Status => None,
        }
    }

    pub fn cycle_mode(&mut self, now: Instant) {
        let next = self.orchestrator.mode().next();
        self.orchestrator.set_mode(next, now);
        self.search_view.selected = None;
        self.history_view.selected = None;
    }

    /// All → first collection → … → last collection → all.
    pub fn cycle_collection(&mut self, now: Instant) {
        let names: Vec<String> = self
            .orchestrator
            .registry()
            .names()
            .map(str::to_string)
            .collect();
        let next = match &self.orchestrator.options().collection {
            None => names.first().cloned(),
            Some(current) => names
                .iter()
                .position(|name| name == current)
                .and_then(|i| names.get(i + 1))
                .cloned(),
        };
        self.orchestrator.set_collection_filter(next, now);
    }

    pub fn toggle(&mut self, toggle: OptionToggle, now: Instant) {
        let mut options = self.orchestrator.options().clone();
        match toggle {
            OptionToggle::Full => options.full = !options.full,
            OptionToggle::LineNumbers => options.line_numbers = !options.line_numbers,
            OptionToggle::All => options.all = !options.all,
        }
        self.orchestrator.set_options(options, now);
    }

    pub fn clear_history(&mut self) {
        self.orchestrator.clear_history();
        self.history_view.selected = None;
        self.notify(NotificationLevel::Info, "History cleared");
        self.report_history_error();
    }

    pub fn move_selection(&mut self, down: bool) {
        let (len, selected) = match self.active_view {
            View::Search => (
                self.orchestrator.results().len(),
                &mut self.search_view.selected,
            ),
            View::History => (
                self.orchestrator.history().len(),
                &mut self.history_view.selected,
            ),
            View::Collections => (
                self.collections_view.collections.len(),
                &mut self.collections_view.selected,
            ),
            View::Status => return,
        };
        *selected = step(*selected, len, down);
    }

    pub fn selected_result(&self) -> Option<&EnrichedResult> {
        self.search_view
            .selected
            .and_then(|i| self.orchestrator.results().get(i))
    }

    pub fn selected_history(&self) -> Option<&HistoryEntry> {
        self.history_view
            .selected
            .and_then(|i| self.orchestrator.history().get(i))
    }

    /// Reflect a settled search. Empty outcomes are shown in place, never
    /// as notifications.
    pub fn apply_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Discarded => return,
            Outcome::Results { .. } => self.search_view.selected = Some(0),
            Outcome::Empty { .. } => self.search_view.selected = None,
            Outcome::Failed(failure) => {
                self.search_view.selected = None;
                let notification = Notification::from_failure(&failure);
                self.status_view.last_detail = notification.detail.clone();
                self.push_notification(notification);
            }
        }
        self.report_history_error();
    }

    fn report_history_error(&mut self) {
        if let Some(err) = self.orchestrator.take_history_error() {
            self.notify(
                NotificationLevel::Warning,
                format!("History could not be saved: {err}"),
            );
        }
    }

    pub fn apply_refresh(&mut self, refresh: Refresh) {
        match refresh.collections {
            Ok(listing) => {
                let mut registry = self.orchestrator.registry().clone();
                registry.merge(CollectionRegistry::from_collections(listing.data));
                self.collections_view.collections = registry.iter().cloned().collect();
                if self
                    .collections_view
                    .selected
                    .is_some_and(|i| i >= self.collections_view.collections.len())
                {
                    self.collections_view.selected = None;
                }
                self.orchestrator.set_registry(Arc::new(registry));
            }
            Err(err) => self.notify(
                NotificationLevel::Warning,
                format!("Could not list collections: {err}"),
            ),
        }
        match refresh.contexts {
            Ok(contexts) => self.collections_view.contexts = contexts.data,
            Err(err) => tracing::warn!(error = %err, "could not list contexts"),
        }
        match refresh.status {
            Ok(status) => self.status_view.status = Some(status.data),
            Err(err) => self.notify(
                NotificationLevel::Warning,
                format!("Could not read index status: {err}"),
            ),
        }
    }

    /// Start a background embed. Returns the job number and its event stream.
    pub fn start_embed(
        &mut self,
        client: &QmdClient,
        force: bool,
    ) -> Option<(u64, mpsc::Receiver<EmbedEvent>)> {
        match EmbedJob::start(client, &self.indexing, force) {
            Ok((handle, events)) => {
                self.embed_jobs += 1;
                self.embed = Some((self.embed_jobs, handle));
                self.status_view.embed_log.clear();
                self.status_view.indexing_active = true;
                self.notify(NotificationLevel::Info, "Embedding started");
                Some((self.embed_jobs, events))
            }
            Err(EmbedError::AlreadyRunning) => {
                self.notify(
                    NotificationLevel::Warning,
                    "An embedding run is already active",
                );
                None
            }
            Err(err) => {
                self.notify(
                    NotificationLevel::Error,
                    format!("Could not start embedding: {err}"),
                );
                None
            }
        }
    }

    /// Returns true when a run was stopped.
    pub fn kill_embed(&mut self) -> bool {
        if self.stop_embed() {
            self.status_view.indexing_active = self.indexing.is_active();
            self.notify(NotificationLevel::Warning, "Embedding terminated");
            true
        } else {
            self.notify(NotificationLevel::Info, "No embedding run to stop");
            false
        }
    }

    /// Terminate the current run without reporting it.
    pub fn stop_embed(&mut self) -> bool {
        match self.embed.take() {
            Some((job, mut handle)) => {
                tracing::info!(job, "terminating embed run");
                handle.terminate();
                true
            }
            None => false,
        }
    }

    /// Returns true when the current run just ended.
    pub fn apply_embed_event(&mut self, job: u64, event: EmbedEvent) -> bool {
        let current = self.embed.as_ref().is_some_and(|(id, _)| *id == job);
        match event {
            EmbedEvent::Progress(line) => {
                if current {
                    self.status_view.embed_log.push_back(line);
                    while self.status_view.embed_log.len() > MAX_EMBED_LOG {
                        self.status_view.embed_log.pop_front();
                    }
                }
                false
            }
            _ if !current => {
                tracing::debug!(job, "ignoring end of a superseded embed run");
                false
            }
            EmbedEvent::Finished => {
                self.embed = None;
                self.status_view.indexing_active = self.indexing.is_active();
                self.notify(NotificationLevel::Success, "Embeddings are up to date");
                true
            }
            EmbedEvent::Failed(message) => {
                self.embed = None;
                self.status_view.indexing_active = self.indexing.is_active();
                self.status_view.last_detail = Some(message.clone());
                self.push_notification(
                    Notification::new(NotificationLevel::Error, "Embedding failed")
                        .with_detail(message),
                );
                true
            }
        }
    }

    pub fn is_embedding(&self) -> bool {
        self.embed.is_some()
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            active_view: self.active_view,
            mode: self.orchestrator.mode(),
            collection: self.orchestrator.options().collection.clone(),
            saved_at: None,
        }
    }

    pub fn restore(&mut self, state: PersistedState, now: Instant) {
        self.active_view = state.active_view;
        self.orchestrator.set_mode(state.mode, now);
        let known = state
            .collection
            .filter(|name| self.orchestrator.registry().get(name).is_some());
        self.orchestrator.set_collection_filter(known, now);
    }
}

fn query_input(text: &str) -> TextArea<'static> {
    let mut input = TextArea::new(vec![text.to_string()]);
    input.set_placeholder_text("Type to search");
    input.set_cursor_line_style(Style::default());
    input.move_cursor(CursorMove::End);
    input
}

fn step(selected: Option<usize>, len: usize, down: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (selected, down) {
        (None, _) => 0,
        (Some(i), true) => (i + 1).min(len - 1),
        (Some(i), false) => i.saturating_sub(1),
    })
}
