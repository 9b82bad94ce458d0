//! Engine client against scripted output: argument vectors, both output
//! shapes, and the streamed embed job.

use qmdview_core::{
    CollectionRegistry, EmbedError, EmbedEvent, EmbedJob, FailureKind, IndexingState,
    QueryRequest, SearchMode, SearchOptions,
};
use qmdview_test_utils::fixtures::{
    search_json, COLLECTION_LIST_TEXT, CONTEXT_LIST_TEXT, INDEX_YAML, LS_TEXT, STATUS_TEXT,
};
use qmdview_test_utils::{InvokeError, Reply, ScriptedRunner, StreamScript};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

async fn drain(mut events: mpsc::Receiver<EmbedEvent>) -> Vec<EmbedEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn search_builds_arguments_and_parses_json() {
    let (client, runner) = ScriptedRunner::new()
        .on(
            &["query"],
            Reply::output(search_json(&[("qmd://notes/a.md", 0.82), ("qmd://work/b.md", 0.41)]))
                .with_stderr("expanding query"),
        )
        .into_client();

    let request = QueryRequest {
        query: "design docs".to_string(),
        mode: SearchMode::Hybrid,
        options: SearchOptions {
            collection: Some("work".to_string()),
            limit: 5,
            ..SearchOptions::default()
        },
    };
    let invocation = client.search(&request).await.unwrap();

    assert_eq!(invocation.data.len(), 2);
    assert_eq!(invocation.data[0].docid, "000001");
    assert_eq!(invocation.diagnostics.as_deref(), Some("expanding query"));
    assert_eq!(
        runner.calls()[0],
        vec!["query", "design docs", "-n", "5", "-c", "work", "--json"]
    );
}

#[tokio::test]
async fn collection_list_text_feeds_the_registry() {
    let (client, runner) = ScriptedRunner::new()
        .on(&["collection", "list"], Reply::output(COLLECTION_LIST_TEXT))
        .into_client();

    let collections = client.collections().await.unwrap().data;
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0].name, "notes");
    assert_eq!(collections[0].root, PathBuf::from("/home/u/notes"));
    assert_eq!(collections[0].documents, 1204);
    assert_eq!(collections[0].embedded, 1180);
    assert_eq!(collections[1].mask, "docs/**/*.md");
    assert_eq!(collections[1].embedded, 0);

    let registry = CollectionRegistry::from_collections(collections);
    assert_eq!(registry.root("work"), Some(Path::new("/srv/work")));
    assert_eq!(runner.calls()[0], vec!["collection", "list"]);
}

#[tokio::test]
async fn context_list_text() {
    let (client, _runner) = ScriptedRunner::new()
        .on(&["context", "list"], Reply::output(CONTEXT_LIST_TEXT))
        .into_client();

    let contexts = client.contexts().await.unwrap().data;
    assert_eq!(contexts.len(), 3);
    assert_eq!(contexts[0].collection, "notes");
    assert_eq!(contexts[0].path, "/");
    assert_eq!(contexts[1].path, "/projects");
    assert_eq!(contexts[1].description, "Side project design docs");
    assert_eq!(contexts[2].collection, "work");
    assert_eq!(contexts[2].path, "/");
    assert_eq!(contexts[2].description, "Engineering handbook");
}

#[tokio::test]
async fn ls_keeps_detail_columns() {
    let (client, runner) = ScriptedRunner::new()
        .on(&["ls"], Reply::output(LS_TEXT))
        .into_client();

    let files = client.ls(Some("notes")).await.unwrap().data;
    assert_eq!(files.len(), 3);
    assert_eq!(files[0].reference, "qmd://notes/journal/2025-01-03.md");
    assert_eq!(files[0].details.as_deref(), Some("2.1 KB 2025-01-03"));
    assert_eq!(files[2].details, None);
    assert_eq!(runner.calls()[0], vec!["ls", "notes"]);
}

#[tokio::test]
async fn get_returns_the_document_verbatim() {
    let body = "# Title\n\nBody text.\n";
    let (client, _runner) = ScriptedRunner::new()
        .on(&["get"], Reply::output(body))
        .into_client();

    let document = client.get("qmd://notes/a.md").await.unwrap().data;
    assert_eq!(document.reference, "qmd://notes/a.md");
    assert_eq!(document.body, body);
}

#[tokio::test]
async fn status_text_is_parsed() {
    let (client, _runner) = ScriptedRunner::new()
        .on(&["status"], Reply::output(STATUS_TEXT))
        .into_client();

    let status = client.status().await.unwrap().data;
    assert_eq!(status.index_path, "/home/u/.cache/qmd/index.sqlite");
    assert_eq!(status.index_size, "48.2 MB");
    assert_eq!(status.total_documents, 1291);
    assert_eq!(status.embedded_documents, 1180);
    assert_eq!(status.pending_embeddings, 111);
    assert_eq!(status.collections, vec!["notes", "work"]);
}

#[tokio::test]
async fn unrecognized_status_is_a_parse_failure() {
    let (client, _runner) = ScriptedRunner::new()
        .on(&["status"], Reply::output("segfault?"))
        .into_client();

    let err = client.status().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Parse);
    assert_eq!(err.raw_output(), Some("segfault?"));
}

#[tokio::test]
async fn cleanup_returns_summary() {
    let (client, _runner) = ScriptedRunner::new()
        .on(&["cleanup"], Reply::output("Removed 3 orphaned documents\n"))
        .into_client();
    assert_eq!(
        client.cleanup().await.unwrap().data,
        "Removed 3 orphaned documents"
    );
}

#[test]
fn index_yaml_registry() {
    let registry = CollectionRegistry::from_index_yaml(INDEX_YAML).unwrap();
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["notes", "work"]);
    assert_eq!(registry.get("work").unwrap().mask, "docs/**/*.md");
}

#[tokio::test(start_paused = true)]
async fn embed_streams_progress_then_finishes() {
    let (client, runner) = ScriptedRunner::new()
        .on_stream(
            &["embed"],
            StreamScript::lines(["Embedding 1/3\rEmbedding 2/3\rEmbedding 3/3", "", "Done"])
                .every(Duration::from_millis(200)),
        )
        .into_client();
    let state = IndexingState::new();

    let (_handle, events) = EmbedJob::start(&client, &state, true).unwrap();
    assert!(state.is_active());
    assert!(matches!(
        EmbedJob::start(&client, &state, false),
        Err(EmbedError::AlreadyRunning)
    ));

    let events = drain(events).await;
    assert_eq!(
        events,
        vec![
            EmbedEvent::Progress("Embedding 3/3".to_string()),
            EmbedEvent::Progress("Done".to_string()),
            EmbedEvent::Finished,
        ]
    );
    assert!(!state.is_active());
    assert_eq!(runner.calls(), vec![vec!["embed", "-f"]]);
}

#[tokio::test(start_paused = true)]
async fn embed_failure_is_the_terminal_event() {
    let (client, _runner) = ScriptedRunner::new()
        .on_stream(
            &["embed"],
            StreamScript::lines(["loading model"])
                .failing(InvokeError::exit(Some(1), "", Some("out of memory".to_string()))),
        )
        .into_client();
    let state = IndexingState::new();

    let (_handle, events) = EmbedJob::start(&client, &state, false).unwrap();
    let events = drain(events).await;
    assert_eq!(events.last(), Some(&EmbedEvent::Failed("out of memory".to_string())));
    assert!(!state.is_active());
}

#[tokio::test(start_paused = true)]
async fn terminate_clears_the_flag_immediately() {
    let (client, _runner) = ScriptedRunner::new()
        .on_stream(
            &["embed"],
            StreamScript::lines(["1", "2", "3"]).every(Duration::from_secs(10)),
        )
        .into_client();
    let state = IndexingState::new();

    let (mut handle, events) = EmbedJob::start(&client, &state, false).unwrap();
    handle.terminate();
    assert!(!state.is_active());

    // A new run may start while the old one winds down.
    let (_second, _second_events) = EmbedJob::start(&client, &state, false).unwrap();
    assert!(state.is_active());

    let events = drain(events).await;
    assert!(matches!(events.last(), Some(EmbedEvent::Failed(_))));
    assert!(state.is_active(), "old run must not clear the new run's flag");
}

#[tokio::test(start_paused = true)]
async fn embed_spawn_failure_releases_the_flag() {
    let (client, _runner) = ScriptedRunner::new().into_client();
    let state = IndexingState::new();

    let err = EmbedJob::start(&client, &state, false).unwrap_err();
    assert!(matches!(err, EmbedError::Invoke(InvokeError::Spawn { .. })));
    assert!(!state.is_active());
}
