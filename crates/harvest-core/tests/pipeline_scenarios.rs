use std::sync::Arc;

use harvest_core::config::{BatchFailurePolicy, WorkerConfig};
use harvest_core::vocab::{status, MAX_RETRY_MESSAGE};
use harvest_core::{Ignored, PipelineOrchestrator, RunOutcome, TaskStatus};
use harvest_shacl::rdf::{difference, parse_ntriples};
use harvest_test_utils::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Harness {
    store: Arc<RecordingStore>,
    orchestrator: PipelineOrchestrator,
    share: TempDir,
}

fn harness() -> Harness {
    harness_with(|config| config)
}

fn harness_with(configure: impl FnOnce(WorkerConfig) -> WorkerConfig) -> Harness {
    let share = TempDir::new().unwrap();
    let config = configure(test_config(share.path()));
    let store = Arc::new(RecordingStore::new());
    let orchestrator = PipelineOrchestrator::from_config(&config, store.clone(), engine()).unwrap();
    Harness {
        store,
        orchestrator,
        share,
    }
}

fn filter_graph(task: &TaskFixture) -> String {
    format!("http://mu.semte.ch/graphs/harvesting/tasks/filtering/{}", task.id)
}

fn validating_graph(task: &TaskFixture) -> String {
    format!("http://mu.semte.ch/graphs/harvesting/tasks/validating/{}", task.id)
}

fn published(store: &RecordingStore, logical_name: &str) -> usize {
    let needle = format!("nfo:fileName \"{logical_name}\"");
    store.updates().iter().filter(|u| u.contains(&needle)).count()
}

#[tokio::test]
async fn conforming_graph_is_filtered_without_errors() {
    let h = harness();
    let task = TaskFixture::new(1, FILTERING);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), CONFORMING_DATA);

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    let RunOutcome::Succeeded(done) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(done.status, TaskStatus::Success);
    assert_eq!(h.store.status_writes(status::BUSY), 1);
    assert_eq!(h.store.status_writes(status::SUCCESS), 1);
    assert_eq!(h.store.error_appends(), 0);

    assert_eq!(published(&h.store, "valid-triples.ttl"), 1);
    assert_eq!(published(&h.store, "validation-report.ttl"), 0);
    assert_eq!(published(&h.store, "error-triples.ttl"), 0);

    let filtered = h.store.memory().graph(named(&filter_graph(&task))).unwrap();
    assert_eq!(filtered, turtle(CONFORMING_DATA));
}

#[tokio::test]
async fn one_violation_removes_only_the_offending_statement() {
    let h = harness();
    let task = TaskFixture::new(2, FILTERING);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), ONE_VIOLATION_DATA);

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Succeeded(_)), "{outcome:?}");

    assert_eq!(published(&h.store, "valid-triples.ttl"), 1);
    assert_eq!(published(&h.store, "validation-report.ttl"), 1);
    assert_eq!(published(&h.store, "error-triples.ttl"), 1);

    let offending = parse_ntriples(OFFENDING_TRIPLE.as_bytes()).unwrap();
    let expected = difference(&turtle(ONE_VIOLATION_DATA), &offending);
    let filtered = h.store.memory().graph(named(&filter_graph(&task))).unwrap();
    assert_eq!(filtered.len(), 5);
    assert_eq!(filtered, expected);

    let links = h
        .store
        .updates()
        .iter()
        .filter(|u| u.contains("task:resultsContainer"))
        .count();
    // three files plus the filter graph
    assert_eq!(links, 4);
}

#[tokio::test]
async fn file_inputs_are_filtered_unit_by_unit() {
    let h = harness();
    let task = TaskFixture::new(3, FILTERING);
    task.seed(h.store.memory());
    task.seed_file_input(
        h.store.memory(),
        h.share.path(),
        &[
            ("a.ttl", "http://ex.org/source/a", CONFORMING_DATA),
            ("b.ttl", "http://ex.org/source/b", ONE_VIOLATION_DATA),
            ("c.ttl", "http://ex.org/source/c", CONFORMING_DATA),
        ],
    );

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Succeeded(_)), "{outcome:?}");

    assert_eq!(published(&h.store, "valid-triples.ttl"), 3);
    assert_eq!(published(&h.store, "validation-report.ttl"), 1);
    assert_eq!(published(&h.store, "error-triples.ttl"), 1);

    let derived_from_b = h
        .store
        .updates()
        .iter()
        .filter(|u| u.contains("prov:wasDerivedFrom <http://ex.org/source/b>"))
        .count();
    assert_eq!(derived_from_b, 3);

    let filtered = h.store.memory().graph(named(&filter_graph(&task))).unwrap();
    assert_eq!(filtered, turtle(CONFORMING_DATA));
}

#[tokio::test]
async fn validating_publishes_reports_and_links_the_input_graph() {
    let h = harness();
    let task = TaskFixture::new(4, VALIDATING);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), ONE_VIOLATION_DATA);

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Succeeded(_)), "{outcome:?}");

    assert_eq!(published(&h.store, "validation-report.ttl"), 1);
    assert_eq!(published(&h.store, "valid-triples.ttl"), 0);

    let report = h.store.memory().graph(named(&validating_graph(&task))).unwrap();
    assert!(!report.is_empty());

    let link = format!(
        "task:hasGraph <{DATA_GRAPH}> ; task:hasValidationGraph <{}>",
        validating_graph(&task)
    );
    assert_eq!(h.store.updates().iter().filter(|u| u.contains(&link)).count(), 1);

    // input data is left untouched
    assert_eq!(
        h.store.memory().graph(named(DATA_GRAPH)).unwrap(),
        turtle(ONE_VIOLATION_DATA)
    );
}

#[tokio::test]
async fn unknown_operation_is_ignored_without_writes() {
    let h = harness();
    let task = TaskFixture::new(5, UNKNOWN_OPERATION);
    task.seed(h.store.memory());

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Ignored(Ignored::UnknownOperation(UNKNOWN_OPERATION.to_string()))
    );
    assert!(h.store.updates().is_empty());
}

#[tokio::test]
async fn non_task_subject_is_ignored() {
    let h = harness();

    let outcome = h.orchestrator.run("http://ex.org/not-a-task").await.unwrap();

    assert_eq!(outcome, RunOutcome::Ignored(Ignored::NotATask));
    assert!(h.store.updates().is_empty());
}

#[tokio::test]
async fn subject_that_is_not_an_iri_is_ignored() {
    let h = harness();

    let outcome = h.orchestrator.run("not an iri").await.unwrap();

    assert_eq!(outcome, RunOutcome::Ignored(Ignored::NotATask));
    assert!(h.store.calls().is_empty());
}

#[tokio::test]
async fn finished_task_is_not_run_again() {
    let h = harness();
    let task = TaskFixture::new(6, FILTERING).with_status(status::SUCCESS);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), CONFORMING_DATA);

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    assert_eq!(outcome, RunOutcome::Ignored(Ignored::NotRunnable(TaskStatus::Success)));
    assert_eq!(h.store.all_status_writes(), 0);
}

#[tokio::test]
async fn failed_task_can_be_retried() {
    let h = harness();
    let task = TaskFixture::new(7, FILTERING).with_status(status::FAILED);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), CONFORMING_DATA);

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Succeeded(_)), "{outcome:?}");
    assert_eq!(h.store.status_writes(status::BUSY), 1);
    assert_eq!(h.store.status_writes(status::SUCCESS), 1);
}

#[tokio::test]
async fn missing_input_container_fails_the_task() {
    let h = harness();
    let task = TaskFixture::new(8, FILTERING).without_input();
    task.seed(h.store.memory());

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    let RunOutcome::Failed { task: failed, message } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.is_some());
    assert!(message.contains("not found"), "{message}");
    assert_eq!(h.store.status_writes(status::FAILED), 1);
    assert_eq!(h.store.error_appends(), 1);
}

#[tokio::test]
async fn container_without_data_fails_the_task() {
    let h = harness();
    let task = TaskFixture::new(9, FILTERING);
    task.seed(h.store.memory());

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    let RunOutcome::Failed { message, .. } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("not found"), "{message}");
    assert!(message.chars().count() <= 100);
    assert_eq!(h.store.error_appends(), 1);
}

#[tokio::test]
async fn missing_input_file_fails_the_task() {
    let h = harness();
    let task = TaskFixture::new(10, FILTERING);
    task.seed(h.store.memory());
    task.seed_file_input(
        h.store.memory(),
        h.share.path(),
        &[("p.ttl", "http://ex.org/source/p", CONFORMING_DATA)],
    );
    std::fs::remove_file(h.share.path().join("p.ttl")).unwrap();

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    let RunOutcome::Failed { message, .. } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("not found"), "{message}");
    assert_eq!(h.store.status_writes(status::FAILED), 1);
}

#[tokio::test]
async fn exhausted_batches_are_recorded_once() {
    let h = harness();
    let task = TaskFixture::new(11, FILTERING);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), CONFORMING_DATA);
    h.store.fail_inserts_into(&filter_graph(&task));

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    let RunOutcome::Failed { message, .. } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(message, MAX_RETRY_MESSAGE);
    // 5 triples in batches of 2, 3 attempts each
    assert_eq!(h.store.insert_attempts_into(&filter_graph(&task)), 9);
    assert_eq!(h.store.status_writes(status::FAILED), 1);
    assert_eq!(h.store.status_writes(status::SUCCESS), 0);
    assert_eq!(h.store.error_appends(), 1);
}

#[tokio::test]
async fn transient_insert_failures_are_retried() {
    let h = harness();
    let task = TaskFixture::new(12, FILTERING);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), CONFORMING_DATA);
    h.store.fail_next_inserts(2);

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Succeeded(_)), "{outcome:?}");
    assert_eq!(h.store.error_appends(), 0);
    let filtered = h.store.memory().graph(named(&filter_graph(&task))).unwrap();
    assert_eq!(filtered, turtle(CONFORMING_DATA));
}

#[tokio::test]
async fn abort_policy_fails_through_the_orchestrator() {
    let h = harness_with(|mut config| {
        config.pipeline = config
            .pipeline
            .with_batch_failure_policy(BatchFailurePolicy::Abort);
        config
    });
    let task = TaskFixture::new(13, FILTERING);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), CONFORMING_DATA);
    h.store.fail_inserts_into(&filter_graph(&task));

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    let RunOutcome::Failed { message, .. } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(message, MAX_RETRY_MESSAGE);
    assert!(h.store.insert_attempts_into(&filter_graph(&task)) >= 3);
    assert_eq!(h.store.status_writes(status::FAILED), 1);
    assert_eq!(h.store.error_appends(), 1);
}

#[tokio::test]
async fn concurrent_exhausted_units_fail_the_task_once() {
    let h = harness();
    let task = TaskFixture::new(14, FILTERING);
    task.seed(h.store.memory());
    task.seed_file_input(
        h.store.memory(),
        h.share.path(),
        &[
            ("a.ttl", "http://ex.org/source/a", CONFORMING_DATA),
            ("b.ttl", "http://ex.org/source/b", CONFORMING_DATA),
        ],
    );
    h.store.fail_inserts_into(&filter_graph(&task));

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    let RunOutcome::Failed { message, .. } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(message, MAX_RETRY_MESSAGE);
    // both units ran every batch: 3 batches of at most 2 triples, 3 attempts each
    assert_eq!(h.store.insert_attempts_into(&filter_graph(&task)), 18);
    assert_eq!(h.store.status_writes(status::FAILED), 1);
    assert_eq!(h.store.all_status_writes(), 2);
    assert_eq!(h.store.error_appends(), 1);
}

#[tokio::test]
async fn failed_success_write_marks_the_task_failed() {
    let h = harness();
    let task = TaskFixture::new(15, FILTERING);
    task.seed(h.store.memory());
    task.seed_graph_input(h.store.memory(), CONFORMING_DATA);
    h.store
        .fail_updates_containing(&format!("adms:status <{}>", status::SUCCESS));

    let outcome = h.orchestrator.run(&task.uri).await.unwrap();

    let RunOutcome::Failed { task: failed, message } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(message.contains("injected update failure"), "{message}");
    assert_eq!(h.store.status_writes(status::SUCCESS), 1);
    assert_eq!(h.store.status_writes(status::FAILED), 1);
    assert_eq!(h.store.error_appends(), 1);
}
