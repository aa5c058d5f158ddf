use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use harvest_core::config::{BatchFailurePolicy, PipelineConfig, PrefixConfig};
use harvest_core::paging::split_batches;
use harvest_core::{
    default_queries, DataContainer, FanOutSettings, InputSource, ModelByDerived,
    PaginatedGraphIO, PagingSettings, PipelineError, SharedStorage, Task, TaskRepository,
    TaskStatus, UnitFanOutProcessor, UnitHandler,
};
use harvest_sparql::{Endpoint, RequestContext};
use harvest_test_utils::*;
use oxigraph::model::{Graph, Literal, NamedNode, Triple};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tempfile::TempDir;

const TARGET_GRAPH: &str = "http://ex.org/graphs/target";

fn numbered_graph(n: usize) -> Graph {
    let mut graph = Graph::new();
    let predicate = NamedNode::new_unchecked("http://ex.org/value");
    for i in 0..n {
        let subject = NamedNode::new_unchecked(format!("http://ex.org/item/{i}"));
        graph.insert(&Triple::new(subject, predicate.clone(), Literal::from(i as i64)));
    }
    graph
}

fn io_with(store: Arc<RecordingStore>, share: &TempDir, config: &PipelineConfig) -> PaginatedGraphIO {
    let repository = Arc::new(TaskRepository::new(
        store,
        default_queries(),
        RequestContext::new(),
        PrefixConfig::default(),
    ));
    PaginatedGraphIO::new(repository, SharedStorage::new(share.path()), PagingSettings::from(config))
}

fn busy_task(n: u32) -> Task {
    Task {
        uri: format!("http://redpencil.data.gift/id/task/{n}"),
        job: JOB.to_string(),
        id: format!("task-{n}"),
        created: "2024-05-01T10:00:00Z".to_string(),
        modified: "2024-05-01T10:00:00Z".to_string(),
        operation_iri: FILTERING.to_string(),
        operation: None,
        status: TaskStatus::Busy,
        graph: TASK_GRAPH.to_string(),
        error: None,
        index: "1".to_string(),
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn paged_read_returns_the_whole_graph(n in 0usize..25, page in 1usize..8) {
        let share = TempDir::new().unwrap();
        let store = Arc::new(RecordingStore::new());
        let graph = numbered_graph(n);
        store.memory().load_graph(named(DATA_GRAPH), &graph).unwrap();
        let io = io_with(store.clone(), &share, &PipelineConfig::default().with_page_size(page));

        let fetched = block_on(io.fetch_graph(DATA_GRAPH)).unwrap();

        prop_assert_eq!(fetched, graph);
        // one count plus ceil(N/P) pages, all on the high-load endpoint
        prop_assert_eq!(store.selects_on(Endpoint::HighLoad), 1 + n.div_ceil(page));
        prop_assert_eq!(store.selects_on(Endpoint::Default), 0);
    }

    #[test]
    fn batched_import_issues_ceil_n_over_b_inserts(n in 0usize..25, batch in 1usize..8) {
        let share = TempDir::new().unwrap();
        let store = Arc::new(RecordingStore::new());
        let graph = numbered_graph(n);
        let io = io_with(store.clone(), &share, &PipelineConfig::default().with_batch_size(batch));

        let summary = block_on(io.import_batched(&busy_task(1), TARGET_GRAPH, &graph)).unwrap();

        prop_assert_eq!(summary.batches, n.div_ceil(batch));
        prop_assert_eq!(summary.triples, n);
        prop_assert_eq!(store.insert_attempts_into(TARGET_GRAPH), n.div_ceil(batch));
        prop_assert_eq!(store.memory().graph(named(TARGET_GRAPH)).unwrap(), graph);
    }

    #[test]
    fn batches_partition_the_graph(n in 0usize..40, size in 1usize..10) {
        let graph = numbered_graph(n);
        let batches = split_batches(&graph, size);

        prop_assert_eq!(batches.len(), n.div_ceil(size));
        prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
        let mut joined = Graph::new();
        for batch in &batches {
            for triple in batch {
                prop_assert!(joined.insert(triple));
            }
        }
        prop_assert_eq!(joined, graph);
    }
}

#[tokio::test]
async fn exhausted_batches_are_retried_max_times_without_touching_the_task() {
    let share = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new());
    let task = TaskFixture::new(1, FILTERING);
    task.seed(store.memory());
    store.fail_inserts_into(TARGET_GRAPH);
    let config = PipelineConfig::default()
        .with_batch_size(10)
        .with_max_retry(4)
        .with_retry_delay_ms(0);
    let io = io_with(store.clone(), &share, &config);

    let err = io
        .import_batched(&busy_task(1), TARGET_GRAPH, &numbered_graph(25))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::BatchesExhausted { failed: 3, total: 3, .. }));
    assert!(err.is_batch_exhaustion());
    assert_eq!(store.insert_attempts_into(TARGET_GRAPH), 12);
    assert_eq!(store.all_status_writes(), 0);
    assert_eq!(store.error_appends(), 0);
}

#[tokio::test]
async fn abort_policy_stops_issuing_batches() {
    let share = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new());
    store.fail_inserts_into(TARGET_GRAPH);
    let config = PipelineConfig::default()
        .with_batch_size(1)
        .with_max_retry(2)
        .with_retry_delay_ms(0)
        .with_batch_failure_policy(BatchFailurePolicy::Abort);
    let io = io_with(store.clone(), &share, &config);

    let err = io
        .import_batched(&busy_task(2), TARGET_GRAPH, &numbered_graph(20))
        .await
        .unwrap_err();

    assert!(err.is_batch_exhaustion());
    // at most the batches in flight when the first one gave up
    assert!(store.insert_attempts_into(TARGET_GRAPH) < 20 * 2);
    assert_eq!(store.error_appends(), 0);
    assert_eq!(store.all_status_writes(), 0);
}

#[tokio::test]
async fn source_detection_follows_the_container() {
    let share = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new());
    let io = io_with(store.clone(), &share, &PipelineConfig::default());

    let graph_task = TaskFixture::new(1, FILTERING);
    graph_task.seed(store.memory());
    graph_task.seed_graph_input(store.memory(), CONFORMING_DATA);
    let container = DataContainer {
        id: "input-task-1".into(),
        uri: graph_task.container().to_string(),
        graph_uri: DATA_GRAPH.to_string(),
        validation_graph_uri: None,
    };
    assert_eq!(io.source(&container).await.unwrap(), InputSource::Graph(DATA_GRAPH.to_string()));

    let file_task = TaskFixture::new(2, FILTERING);
    file_task.seed(store.memory());
    file_task.seed_file_input(store.memory(), share.path(), &[("a.ttl", "http://ex.org/a", CONFORMING_DATA)]);
    let container = DataContainer {
        id: "input-task-2".into(),
        uri: file_task.container().to_string(),
        graph_uri: file_task.container().to_string(),
        validation_graph_uri: None,
    };
    assert_eq!(io.source(&container).await.unwrap(), InputSource::Files);

    let empty = DataContainer {
        id: "empty".into(),
        uri: "http://ex.org/containers/empty".into(),
        graph_uri: "http://ex.org/containers/empty".into(),
        validation_graph_uri: None,
    };
    assert!(matches!(io.source(&empty).await, Err(PipelineError::NotFound(_))));
}

#[tokio::test]
async fn file_units_carry_their_provenance() {
    let share = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new());
    let task = TaskFixture::new(3, FILTERING);
    task.seed(store.memory());
    task.seed_file_input(
        store.memory(),
        share.path(),
        &[
            ("a.ttl", "http://ex.org/source/a", CONFORMING_DATA),
            ("b.ttl", "http://ex.org/source/b", ONE_VIOLATION_DATA),
            ("c.ttl", "http://ex.org/source/c", CONFORMING_DATA),
        ],
    );
    let io = io_with(store.clone(), &share, &PipelineConfig::default().with_page_size(2));
    let container = DataContainer {
        id: "input-task-3".into(),
        uri: task.container().to_string(),
        graph_uri: task.container().to_string(),
        validation_graph_uri: None,
    };

    let units = io.fetch_paged(&container).await.unwrap();

    let provenance: Vec<&str> = units.iter().map(|u| u.derived_from.as_str()).collect();
    assert_eq!(
        provenance,
        vec!["http://ex.org/source/a", "http://ex.org/source/b", "http://ex.org/source/c"]
    );
    assert_eq!(units[1].graph, turtle(ONE_VIOLATION_DATA));
}

struct CountingHandler {
    handled: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    fail: bool,
}

impl CountingHandler {
    fn new(fail: bool) -> Self {
        Self {
            handled: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait]
impl UnitHandler for CountingHandler {
    async fn handle(&self, _task: &Task, unit: ModelByDerived) -> Result<(), PipelineError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.handled.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PipelineError::InvalidInput(format!("rejected {}", unit.derived_from)));
        }
        Ok(())
    }
}

fn five_file_fanout(store: &Arc<RecordingStore>, share: &TempDir) -> (UnitFanOutProcessor, DataContainer) {
    let task = TaskFixture::new(4, FILTERING);
    task.seed(store.memory());
    let files: Vec<(String, String)> = (0..5)
        .map(|i| (format!("unit-{i}.ttl"), format!("http://ex.org/source/{i}")))
        .collect();
    let specs: Vec<(&str, &str, &str)> = files
        .iter()
        .map(|(name, source)| (name.as_str(), source.as_str(), CONFORMING_DATA))
        .collect();
    task.seed_file_input(store.memory(), share.path(), &specs);

    let io = Arc::new(io_with(store.clone(), share, &PipelineConfig::default()));
    let fanout = UnitFanOutProcessor::new(
        io,
        FanOutSettings {
            page_size: 2,
            max_concurrent: 2,
            start_delay: Duration::ZERO,
        },
    );
    let container = DataContainer {
        id: "input-task-4".into(),
        uri: task.container().to_string(),
        graph_uri: task.container().to_string(),
        validation_graph_uri: None,
    };
    (fanout, container)
}

#[tokio::test]
async fn fanout_processes_every_page_within_the_concurrency_bound() {
    let share = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new());
    let (fanout, container) = five_file_fanout(&store, &share);
    let handler = Arc::new(CountingHandler::new(false));

    let summary = fanout
        .process(&busy_task(4), &container, handler.clone())
        .await
        .unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.units, 5);
    assert_eq!(handler.handled.load(Ordering::SeqCst), 5);
    assert!(handler.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn failing_page_stops_further_pages() {
    let share = TempDir::new().unwrap();
    let store = Arc::new(RecordingStore::new());
    let (fanout, container) = five_file_fanout(&store, &share);
    let handler = Arc::new(CountingHandler::new(true));

    let err = fanout
        .process(&busy_task(4), &container, handler.clone())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UnitFailed { .. }), "{err}");
    // the first page joins completely, nothing after it starts
    assert_eq!(handler.handled.load(Ordering::SeqCst), 2);
}
