//! Search orchestrator: the per-view state machine that decides when a query
//! is sent to the engine and whether a response may touch the result set.
//!
//! ```text
//! idle ──text──▶ debouncing ──400ms quiet──▶ in-flight ──response──▶ settled
//!   ▲    (cheap)                                ▲
//!   │                                           │ explicit trigger
//!   └──clear── pending-confirmation ────────────┘
//!                 (expensive)
//! ```
//!
//! The orchestrator itself never awaits. Callers pass the current instant in,
//! hand [`Dispatch`]es to a [`SearchDriver`], and feed completions back
//! through [`Orchestrator::complete`]. Only the response for the most
//! recently allocated [`RequestId`] is ever applied.

use crate::client::{InvokeResult, QmdClient};
use crate::enrich::enrich;
use crate::error::{FailureKind, InvokeError};
use crate::history::HistoryStore;
use crate::registry::CollectionRegistry;
use crate::types::{
    EnrichedResult, HistoryEntry, QueryRequest, RequestId, SearchMode, SearchOptions, SearchResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Quiet period before a cheap-mode query fires.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// No query text.
    Idle,
    /// Cheap mode, waiting for typing to pause.
    Debouncing { deadline: Instant },
    /// Expensive mode, waiting for an explicit trigger.
    PendingConfirmation,
    InFlight(RequestId),
    /// Results or an empty state are showing.
    Settled,
}

/// What happens when the collection filter or an option changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionRefresh {
    /// Options apply to the next search only.
    Never,
    /// Cheap mode restarts the debounce window; expensive modes wait.
    #[default]
    CheapModeOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub debounce: Duration,
    pub option_refresh: OptionRefresh,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_DELAY,
            option_refresh: OptionRefresh::default(),
        }
    }
}

/// A request the caller must send to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub id: RequestId,
    pub request: QueryRequest,
}

/// User-facing description of a failed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
    pub kind: FailureKind,
    pub title: String,
    pub message: String,
    /// Engine stderr, for copying into a bug report.
    pub diagnostics: Option<String>,
    /// Unparsed stdout, set for parse failures.
    pub raw_output: Option<String>,
}

impl SearchFailure {
    pub fn from_error(mode: SearchMode, err: &InvokeError) -> Self {
        let kind = err.kind();
        let title = match kind {
            FailureKind::Spawn => "Could not start qmd".to_string(),
            FailureKind::Exit => format!("{mode} search failed"),
            FailureKind::Timeout => format!("{mode} search timed out"),
            FailureKind::Terminated => format!("{mode} search was interrupted"),
            FailureKind::Parse => "Unreadable search output".to_string(),
        };
        Self {
            kind,
            title,
            message: err.to_string(),
            diagnostics: err.diagnostics().map(str::to_string),
            raw_output: err.raw_output().map(str::to_string),
        }
    }
}

/// Effect of feeding a response back into the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Superseded response; nothing changed.
    Discarded,
    Results { count: usize },
    /// The engine found nothing. Not an error.
    Empty { suggestion: &'static str },
    Failed(SearchFailure),
}

/// The dispatched request whose response is still awaited.
#[derive(Debug, Clone, PartialEq)]
struct Pending {
    id: RequestId,
    query: String,
}

#[derive(Debug)]
pub struct Orchestrator {
    mode: SearchMode,
    query: String,
    options: SearchOptions,
    phase: SearchPhase,
    latest: RequestId,
    /// Independent of `phase`: text may be re-debouncing while this runs.
    in_flight: Option<Pending>,
    results: Vec<EnrichedResult>,
    last_outcome: Option<Outcome>,
    registry: Arc<CollectionRegistry>,
    history: HistoryStore,
    ready: bool,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        mode: SearchMode,
        registry: Arc<CollectionRegistry>,
        mut history: HistoryStore,
        settings: OrchestratorSettings,
    ) -> Self {
        history.load(mode);
        Self {
            mode,
            query: String::new(),
            options: SearchOptions::default(),
            phase: SearchPhase::Idle,
            latest: RequestId::default(),
            in_flight: None,
            results: Vec::new(),
            last_outcome: None,
            registry,
            history,
            ready: true,
            settings,
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn latest(&self) -> RequestId {
        self.latest
    }

    pub fn results(&self) -> &[EnrichedResult] {
        &self.results
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Swap in a refreshed registry. Already-enriched results keep their paths.
    pub fn set_registry(&mut self, registry: Arc<CollectionRegistry>) {
        self.registry = registry;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// While not ready nothing is dispatched.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// When the debounce window closes, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            SearchPhase::Debouncing { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.entries(self.mode)
    }

    pub fn clear_history(&mut self) {
        self.history.clear(self.mode);
    }

    /// Last history persistence failure, if any, cleared on read.
    pub fn take_history_error(&mut self) -> Option<String> {
        self.history.take_error()
    }

    /// Text edit. Never dispatches by itself.
    pub fn set_query(&mut self, text: &str, now: Instant) {
        if text == self.query {
            return;
        }
        self.query = text.to_string();
        self.evaluate(now);
    }

    /// Mode switch: results are cleared and the trigger policy re-applied
    /// to the current text.
    pub fn set_mode(&mut self, mode: SearchMode, now: Instant) {
        if mode == self.mode {
            return;
        }
        tracing::debug!(from = %self.mode, to = %mode, "search mode changed");
        self.mode = mode;
        self.abandon_in_flight("mode changed");
        self.results.clear();
        self.last_outcome = None;
        self.history.load(mode);
        self.evaluate(now);
    }

    pub fn set_collection_filter(&mut self, collection: Option<String>, now: Instant) {
        if self.options.collection == collection {
            return;
        }
        self.options.collection = collection;
        self.refresh_after_option_change(now);
    }

    pub fn set_options(&mut self, options: SearchOptions, now: Instant) {
        if self.options == options {
            return;
        }
        self.options = options;
        self.refresh_after_option_change(now);
    }

    /// Explicit trigger (Enter). Works in every mode.
    pub fn confirm(&mut self, _now: Instant) -> Option<Dispatch> {
        if self.query.trim().is_empty() {
            return None;
        }
        self.dispatch()
    }

    /// Fire the debounced query once its window has closed.
    pub fn poll(&mut self, now: Instant) -> Option<Dispatch> {
        match self.phase {
            SearchPhase::Debouncing { deadline } if now >= deadline => self.dispatch(),
            _ => None,
        }
    }

    /// Re-run a history entry in its own mode. Selecting an entry counts as
    /// an explicit trigger.
    pub fn recall(&mut self, entry: &HistoryEntry, _now: Instant) -> Option<Dispatch> {
        if entry.mode != self.mode {
            self.mode = entry.mode;
            self.abandon_in_flight("mode changed");
            self.history.load(entry.mode);
        }
        self.query = entry.query.clone();
        self.results.clear();
        self.last_outcome = None;
        self.dispatch()
    }

    /// Apply a response. Anything but the latest in-flight request is
    /// discarded without touching state. Edits made since dispatch do not
    /// invalidate the response; a mode switch or cleared text does.
    pub fn complete(
        &mut self,
        id: RequestId,
        result: InvokeResult<Vec<SearchResult>>,
    ) -> Outcome {
        let pending = match self.in_flight.take() {
            Some(pending) if pending.id == id && id == self.latest => pending,
            other => {
                self.in_flight = other;
                tracing::debug!(request = id.value(), latest = self.latest.value(), "discarding stale search response");
                return Outcome::Discarded;
            }
        };
        if self.phase == SearchPhase::InFlight(id) {
            self.phase = SearchPhase::Settled;
        }

        let outcome = match result {
            Ok(invocation) => {
                if let Some(diagnostics) = invocation.diagnostics.as_deref() {
                    tracing::debug!(request = id.value(), %diagnostics, "engine diagnostics");
                }
                self.results = invocation
                    .data
                    .into_iter()
                    .map(|raw| enrich(raw, &self.registry))
                    .collect();
                self.record_history(&pending.query);
                if self.results.is_empty() {
                    Outcome::Empty {
                        suggestion: empty_suggestion(self.mode),
                    }
                } else {
                    Outcome::Results {
                        count: self.results.len(),
                    }
                }
            }
            Err(err) if err.is_no_results() => {
                self.results.clear();
                self.record_history(&pending.query);
                Outcome::Empty {
                    suggestion: empty_suggestion(self.mode),
                }
            }
            Err(err) => {
                self.results.clear();
                tracing::warn!(request = id.value(), mode = %self.mode, kind = ?err.kind(), error = %err, "search failed");
                Outcome::Failed(SearchFailure::from_error(self.mode, &err))
            }
        };

        tracing::debug!(request = id.value(), outcome = ?outcome, "search settled");
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    fn evaluate(&mut self, now: Instant) {
        self.phase = if self.query.trim().is_empty() {
            self.abandon_in_flight("query cleared");
            self.results.clear();
            self.last_outcome = None;
            SearchPhase::Idle
        } else if self.mode.is_cheap() {
            SearchPhase::Debouncing {
                deadline: now + self.settings.debounce,
            }
        } else {
            SearchPhase::PendingConfirmation
        };
    }

    fn refresh_after_option_change(&mut self, now: Instant) {
        let refresh = match self.settings.option_refresh {
            OptionRefresh::Never => false,
            OptionRefresh::CheapModeOnly => self.mode.is_cheap() && !self.query.trim().is_empty(),
        };
        if refresh {
            self.phase = SearchPhase::Debouncing {
                deadline: now + self.settings.debounce,
            };
        }
    }

    fn dispatch(&mut self) -> Option<Dispatch> {
        if !self.ready {
            tracing::debug!(mode = %self.mode, "engine not ready, search held");
            self.phase = SearchPhase::PendingConfirmation;
            return None;
        }
        self.latest = self.latest.next();
        self.phase = SearchPhase::InFlight(self.latest);
        let request = QueryRequest {
            query: self.query.trim().to_string(),
            mode: self.mode,
            options: self.options.clone(),
        };
        self.in_flight = Some(Pending {
            id: self.latest,
            query: request.query.clone(),
        });
        tracing::debug!(request = self.latest.value(), mode = %self.mode, query = %request.query, "dispatching search");
        Some(Dispatch {
            id: self.latest,
            request,
        })
    }

    fn abandon_in_flight(&mut self, reason: &'static str) {
        if let Some(pending) = self.in_flight.take() {
            tracing::debug!(request = pending.id.value(), reason, "abandoning in-flight search");
        }
    }

    /// Records the query that produced the response, not the current text.
    fn record_history(&mut self, query: &str) {
        self.history.add(query, self.mode);
    }
}

/// Hint shown beside an empty result set.
pub fn empty_suggestion(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::Keyword => {
            "No exact matches. Try Hybrid mode for meaning-based results."
        }
        SearchMode::Semantic => {
            "Nothing similar found. Try Keyword mode for exact terms, or build embeddings first."
        }
        SearchMode::Hybrid => "Nothing found. Try fewer or more general terms.",
    }
}

/// A finished engine call, tagged with the request it answers.
#[derive(Debug)]
pub struct SearchCompletion {
    pub id: RequestId,
    pub result: InvokeResult<Vec<SearchResult>>,
}

/// Runs dispatched searches concurrently with the event loop. Superseded
/// calls are not cancelled; their completions are discarded on arrival.
#[derive(Debug, Clone)]
pub struct SearchDriver {
    client: QmdClient,
    completions: mpsc::UnboundedSender<SearchCompletion>,
}

impl SearchDriver {
    pub fn new(client: QmdClient) -> (Self, mpsc::UnboundedReceiver<SearchCompletion>) {
        let (completions, rx) = mpsc::unbounded_channel();
        (Self { client, completions }, rx)
    }

    pub fn client(&self) -> &QmdClient {
        &self.client
    }

    pub fn dispatch(&self, dispatch: Dispatch) -> JoinHandle<()> {
        let client = self.client.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = client.search(&dispatch.request).await;
            if completions
                .send(SearchCompletion {
                    id: dispatch.id,
                    result,
                })
                .is_err()
            {
                tracing::debug!(request = dispatch.id.value(), "search completed after shutdown");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Invocation;
    use crate::history::HistoryScope;
    use crate::types::Collection;
    use std::path::PathBuf;

    fn orchestrator(mode: SearchMode) -> Orchestrator {
        orchestrator_with(mode, OrchestratorSettings::default())
    }

    fn orchestrator_with(mode: SearchMode, settings: OrchestratorSettings) -> Orchestrator {
        let registry = CollectionRegistry::from_collections(vec![Collection {
            name: "notes".to_string(),
            root: PathBuf::from("/home/u/notes"),
            ..Collection::default()
        }]);
        Orchestrator::new(
            mode,
            Arc::new(registry),
            HistoryStore::in_memory(HistoryScope::PerMode),
            settings,
        )
    }

    fn hit(file: &str, score: f64) -> SearchResult {
        SearchResult {
            file: file.to_string(),
            docid: "abc123".to_string(),
            title: "Title".to_string(),
            score,
            snippet: "snippet".to_string(),
            line: None,
        }
    }

    fn found(hits: Vec<SearchResult>) -> InvokeResult<Vec<SearchResult>> {
        Ok(Invocation {
            data: hits,
            diagnostics: None,
        })
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn empty_text_is_idle_and_never_dispatches() {
        let mut orch = orchestrator(SearchMode::Keyword);
        let t0 = Instant::now();
        orch.set_query("   ", t0);
        assert_eq!(orch.phase(), SearchPhase::Idle);
        assert_eq!(orch.poll(t0 + ms(1000)), None);
        assert_eq!(orch.confirm(t0), None);
    }

    #[test]
    fn rapid_edits_dispatch_once_after_quiet_period() {
        let mut orch = orchestrator(SearchMode::Keyword);
        let t0 = Instant::now();
        orch.set_query("r", t0);
        orch.set_query("ru", t0 + ms(100));
        assert_eq!(orch.poll(t0 + ms(450)), None);
        orch.set_query("rust", t0 + ms(300));
        assert_eq!(orch.poll(t0 + ms(699)), None);

        let dispatch = orch.poll(t0 + ms(700)).unwrap();
        assert_eq!(dispatch.request.query, "rust");
        assert_eq!(dispatch.request.mode, SearchMode::Keyword);
        assert_eq!(orch.phase(), SearchPhase::InFlight(dispatch.id));
        assert_eq!(orch.poll(t0 + ms(2000)), None);
    }

    #[test]
    fn expensive_mode_waits_for_confirmation() {
        let mut orch = orchestrator(SearchMode::Semantic);
        let t0 = Instant::now();
        orch.set_query("embedding models", t0);
        assert_eq!(orch.phase(), SearchPhase::PendingConfirmation);
        assert_eq!(orch.deadline(), None);
        assert_eq!(orch.poll(t0 + ms(10_000)), None);

        let dispatch = orch.confirm(t0 + ms(10_000)).unwrap();
        assert_eq!(dispatch.request.to_args()[0], "vsearch");
    }

    #[test]
    fn switching_to_expensive_mode_clears_results_and_waits() {
        let mut orch = orchestrator(SearchMode::Keyword);
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        let dispatch = orch.poll(t0 + ms(400)).unwrap();
        orch.complete(dispatch.id, found(vec![hit("qmd://notes/a.md", 0.9)]));
        assert_eq!(orch.results().len(), 1);

        orch.set_mode(SearchMode::Hybrid, t0 + ms(500));
        assert_eq!(orch.phase(), SearchPhase::PendingConfirmation);
        assert!(orch.results().is_empty());
        assert_eq!(orch.poll(t0 + ms(5000)), None);
    }

    #[test]
    fn switching_back_to_cheap_mode_debounces() {
        let mut orch = orchestrator(SearchMode::Hybrid);
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        orch.set_mode(SearchMode::Keyword, t0 + ms(10));
        assert_eq!(orch.deadline(), Some(t0 + ms(410)));
    }

    #[test]
    fn late_response_from_superseded_request_is_discarded() {
        let mut orch = orchestrator(SearchMode::Hybrid);
        let t0 = Instant::now();
        orch.set_query("first", t0);
        let first = orch.confirm(t0).unwrap();
        orch.set_query("second", t0 + ms(50));
        let second = orch.confirm(t0 + ms(50)).unwrap();
        assert!(second.id > first.id);

        let applied = orch.complete(second.id, found(vec![hit("qmd://notes/second.md", 0.8)]));
        assert_eq!(applied, Outcome::Results { count: 1 });

        let stale = orch.complete(first.id, found(vec![hit("qmd://notes/first.md", 0.9)]));
        assert_eq!(stale, Outcome::Discarded);
        assert_eq!(orch.results()[0].raw.file, "qmd://notes/second.md");
        assert_eq!(orch.history().len(), 1);
    }

    #[test]
    fn edit_during_hybrid_search_keeps_its_response() {
        let mut orch = orchestrator(SearchMode::Hybrid);
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        let dispatch = orch.confirm(t0).unwrap();
        orch.set_query("rust ", t0 + ms(20));
        assert_eq!(orch.phase(), SearchPhase::PendingConfirmation);
        assert!(orch.is_in_flight());

        let outcome = orch.complete(dispatch.id, found(vec![hit("qmd://notes/a.md", 0.9)]));
        assert_eq!(outcome, Outcome::Results { count: 1 });
        assert_eq!(orch.results().len(), 1);
        assert_eq!(orch.history()[0].query, "rust");
        assert_eq!(orch.phase(), SearchPhase::PendingConfirmation);
        assert!(!orch.is_in_flight());
    }

    #[test]
    fn edit_during_keyword_search_applies_response_and_keeps_debouncing() {
        let mut orch = orchestrator(SearchMode::Keyword);
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        let dispatch = orch.poll(t0 + ms(400)).unwrap();
        orch.set_query("rust async", t0 + ms(450));

        let outcome = orch.complete(dispatch.id, found(vec![hit("qmd://notes/a.md", 0.9)]));
        assert_eq!(outcome, Outcome::Results { count: 1 });
        assert_eq!(orch.deadline(), Some(t0 + ms(850)));
        let next = orch.poll(t0 + ms(850)).unwrap();
        assert_eq!(next.request.query, "rust async");
    }

    #[test]
    fn clearing_text_abandons_the_running_search() {
        let mut orch = orchestrator(SearchMode::Hybrid);
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        let dispatch = orch.confirm(t0).unwrap();
        orch.set_query("", t0 + ms(20));
        assert!(!orch.is_in_flight());
        assert_eq!(
            orch.complete(dispatch.id, found(vec![hit("qmd://notes/a.md", 0.9)])),
            Outcome::Discarded
        );
        assert!(orch.results().is_empty());
        assert!(orch.history().is_empty());
    }

    #[test]
    fn mode_switch_abandons_the_running_search() {
        let mut orch = orchestrator(SearchMode::Hybrid);
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        let dispatch = orch.confirm(t0).unwrap();
        orch.set_mode(SearchMode::Keyword, t0 + ms(20));
        assert_eq!(
            orch.complete(dispatch.id, found(vec![hit("qmd://notes/a.md", 0.9)])),
            Outcome::Discarded
        );
        assert!(orch.results().is_empty());
    }

    #[test]
    fn success_enriches_and_records_history() {
        let mut orch = orchestrator(SearchMode::Keyword);
        let t0 = Instant::now();
        orch.set_query(" rust ", t0);
        let dispatch = orch.poll(t0 + ms(400)).unwrap();
        orch.complete(dispatch.id, found(vec![hit("qmd://notes/sub/file.md", 0.75)]));

        let result = &orch.results()[0];
        assert_eq!(
            result.absolute_path,
            Some(PathBuf::from("/home/u/notes/sub/file.md"))
        );
        assert_eq!(orch.phase(), SearchPhase::Settled);
        assert_eq!(orch.history()[0].query, "rust");
    }

    #[test]
    fn zero_records_is_a_calm_empty_outcome() {
        let mut orch = orchestrator(SearchMode::Keyword);
        let t0 = Instant::now();
        orch.set_query("zzz", t0);
        let dispatch = orch.poll(t0 + ms(400)).unwrap();
        let outcome = orch.complete(dispatch.id, found(Vec::new()));
        assert_eq!(
            outcome,
            Outcome::Empty {
                suggestion: empty_suggestion(SearchMode::Keyword)
            }
        );
        assert!(empty_suggestion(SearchMode::Keyword).contains("Hybrid"));
    }

    #[test]
    fn no_results_error_is_an_empty_outcome() {
        let mut orch = orchestrator(SearchMode::Semantic);
        let t0 = Instant::now();
        orch.set_query("zzz", t0);
        let dispatch = orch.confirm(t0).unwrap();
        let err = InvokeError::exit(Some(1), "No results found.", None);
        let outcome = orch.complete(dispatch.id, Err(err));
        assert!(matches!(outcome, Outcome::Empty { .. }));
    }

    #[test]
    fn failure_clears_results_and_carries_diagnostics() {
        let mut orch = orchestrator(SearchMode::Keyword);
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        let first = orch.poll(t0 + ms(400)).unwrap();
        orch.complete(first.id, found(vec![hit("qmd://notes/a.md", 0.9)]));

        orch.set_query("rust!", t0 + ms(500));
        let second = orch.poll(t0 + ms(900)).unwrap();
        let err = InvokeError::exit(Some(2), "", Some("sqlite: database is locked".to_string()));
        let Outcome::Failed(failure) = orch.complete(second.id, Err(err)) else {
            panic!("expected a failure");
        };
        assert!(orch.results().is_empty());
        assert_eq!(failure.kind, FailureKind::Exit);
        assert_eq!(failure.message, "sqlite: database is locked");
        assert_eq!(
            failure.diagnostics.as_deref(),
            Some("sqlite: database is locked")
        );
        assert_eq!(orch.history().len(), 1);
    }

    #[test]
    fn not_ready_holds_the_search() {
        let mut orch = orchestrator(SearchMode::Keyword);
        orch.set_ready(false);
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        assert_eq!(orch.poll(t0 + ms(400)), None);
        assert_eq!(orch.phase(), SearchPhase::PendingConfirmation);

        orch.set_ready(true);
        assert!(orch.confirm(t0 + ms(500)).is_some());
    }

    #[test]
    fn filter_change_restarts_debounce_in_cheap_mode_only() {
        let t0 = Instant::now();

        let mut cheap = orchestrator(SearchMode::Keyword);
        cheap.set_query("rust", t0);
        let dispatch = cheap.poll(t0 + ms(400)).unwrap();
        cheap.complete(dispatch.id, found(vec![hit("qmd://notes/a.md", 0.9)]));
        cheap.set_collection_filter(Some("notes".to_string()), t0 + ms(1000));
        let refreshed = cheap.poll(t0 + ms(1400)).unwrap();
        assert_eq!(refreshed.request.options.collection.as_deref(), Some("notes"));

        let mut expensive = orchestrator(SearchMode::Hybrid);
        expensive.set_query("rust", t0);
        expensive.set_collection_filter(Some("notes".to_string()), t0);
        assert_eq!(expensive.phase(), SearchPhase::PendingConfirmation);
    }

    #[test]
    fn never_policy_leaves_settled_search_alone() {
        let mut orch = orchestrator_with(
            SearchMode::Keyword,
            OrchestratorSettings {
                option_refresh: OptionRefresh::Never,
                ..OrchestratorSettings::default()
            },
        );
        let t0 = Instant::now();
        orch.set_query("rust", t0);
        let dispatch = orch.poll(t0 + ms(400)).unwrap();
        orch.complete(dispatch.id, found(Vec::new()));
        orch.set_collection_filter(Some("notes".to_string()), t0 + ms(500));
        assert_eq!(orch.phase(), SearchPhase::Settled);
        assert_eq!(orch.poll(t0 + ms(5000)), None);
    }

    #[test]
    fn recall_dispatches_in_the_entry_mode() {
        let mut orch = orchestrator(SearchMode::Keyword);
        let entry = HistoryEntry {
            query: "vector db".to_string(),
            mode: SearchMode::Semantic,
            timestamp: chrono::Utc::now(),
        };
        let dispatch = orch.recall(&entry, Instant::now()).unwrap();
        assert_eq!(orch.mode(), SearchMode::Semantic);
        assert_eq!(dispatch.request.query, "vector db");
        assert_eq!(dispatch.request.mode, SearchMode::Semantic);
    }
}
