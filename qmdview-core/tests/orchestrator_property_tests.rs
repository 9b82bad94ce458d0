//! Property-Based Tests for the search lifecycle
//!
//! - Debounce: a burst of edits in keyword mode dispatches once per quiet period
//! - Race guard: whatever order responses arrive in, only the latest applies
//! - Relevance tiers and percentage formatting over the score range
//! - History: bounded, unique, most recent first

use proptest::prelude::*;
use qmdview_core::{
    format_percentage, HistoryScope, HistoryStore, Invocation, Orchestrator,
    OrchestratorSettings, Outcome, Relevance, SearchMode, MAX_HISTORY,
};
use qmdview_test_utils::fixtures::{hit, sample_registry};
use qmdview_test_utils::generators::{arb_keystroke_gaps, arb_mode, arb_query, arb_score};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn orchestrator(mode: SearchMode) -> Orchestrator {
    Orchestrator::new(
        mode,
        Arc::new(sample_registry()),
        HistoryStore::in_memory(HistoryScope::PerMode),
        OrchestratorSettings::default(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Keystrokes separated by `gaps` ms: the debounce fires before the next
    /// keystroke only if the gap exceeds the poll point, and once after the last.
    #[test]
    fn prop_one_dispatch_per_quiet_period(gaps in arb_keystroke_gaps()) {
        let mut orch = orchestrator(SearchMode::Keyword);
        let base = Instant::now();
        let mut at = base;
        let mut dispatched = Vec::new();

        for (i, gap) in gaps.iter().enumerate() {
            let next = at + Duration::from_millis(*gap);
            if i > 0 {
                // Last poll before the next keystroke lands.
                if let Some(d) = orch.poll(next - Duration::from_millis(1)) {
                    dispatched.push(d);
                }
            }
            at = next;
            orch.set_query(&format!("q{i}"), at);
        }
        if let Some(d) = orch.poll(at + Duration::from_secs(60)) {
            dispatched.push(d);
        }

        let quiet_gaps = gaps.iter().skip(1).filter(|gap| **gap > 400).count();
        prop_assert_eq!(dispatched.len(), quiet_gaps + 1);
        let last = dispatched.last().unwrap();
        prop_assert_eq!(&last.request.query, &format!("q{}", gaps.len() - 1));
    }

    /// Expensive modes never dispatch from a timer.
    #[test]
    fn prop_expensive_modes_wait(query in arb_query(), wait_ms in 0u64..60_000) {
        for mode in [SearchMode::Semantic, SearchMode::Hybrid] {
            let mut orch = orchestrator(mode);
            let t0 = Instant::now();
            orch.set_query(&query, t0);
            prop_assert!(orch.poll(t0 + Duration::from_millis(wait_ms)).is_none());
        }
    }

    #[test]
    fn prop_only_latest_response_applies(
        order in Just((0usize..6).collect::<Vec<_>>()).prop_shuffle(),
        mode in arb_mode(),
    ) {
        let mut orch = orchestrator(mode);
        let t0 = Instant::now();
        let mut dispatches = Vec::new();
        for i in 0..order.len() {
            orch.set_query(&format!("query {i}"), t0);
            dispatches.push(orch.confirm(t0).unwrap());
        }
        let latest = dispatches.last().unwrap().id;

        for index in order {
            let dispatch = &dispatches[index];
            let file = format!("qmd://notes/{index}.md");
            let outcome = orch.complete(
                dispatch.id,
                Ok(Invocation { data: vec![hit(&file, 0.5)], diagnostics: None }),
            );
            if dispatch.id == latest {
                prop_assert_eq!(outcome, Outcome::Results { count: 1 });
            } else {
                prop_assert_eq!(outcome, Outcome::Discarded);
            }
        }
        prop_assert_eq!(&orch.results()[0].raw.file, "qmd://notes/5.md");
    }

    #[test]
    fn prop_relevance_tiers(score in arb_score()) {
        let expected = if score >= 0.70 {
            Relevance::High
        } else if score >= 0.40 {
            Relevance::Medium
        } else {
            Relevance::Low
        };
        prop_assert_eq!(Relevance::classify(score), expected);
    }

    #[test]
    fn prop_percentage_is_rounded(score in 0.0f64..=1.0) {
        let text = format_percentage(score);
        let percent: f64 = text.trim_end_matches('%').parse().unwrap();
        prop_assert!((0.0..=100.0).contains(&percent));
        prop_assert!((percent - score * 100.0).abs() <= 0.5);
    }

    #[test]
    fn prop_history_bounded_unique_recent_first(
        queries in prop::collection::vec("[a-f]{1,2}", 1..40),
    ) {
        let mut store = HistoryStore::in_memory(HistoryScope::PerMode);
        for query in &queries {
            store.add(query, SearchMode::Keyword);
        }
        let entries = store.entries(SearchMode::Keyword);
        prop_assert!(entries.len() <= MAX_HISTORY);
        prop_assert_eq!(&entries[0].query, queries.last().unwrap());

        let mut seen = std::collections::HashSet::new();
        for entry in entries {
            prop_assert!(seen.insert(entry.query.clone()));
        }
    }
}
