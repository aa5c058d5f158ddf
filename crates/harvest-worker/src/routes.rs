//! HTTP routes
//!
//! - `POST /delta`: change sets from the delta notifier; scheduled tasks are queued
//! - `POST /retry?taskUri=`: queue one task again
//! - `GET /health`: liveness

use harvest_core::delta::{scheduled_subjects, ChangeSet};
use harvest_core::WorkQueue;
use serde::Deserialize;
use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Largest accepted delta body
const MAX_DELTA_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetryQuery {
    task_uri: String,
}

/// All routes of the worker
pub fn routes(queue: WorkQueue) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_queue = warp::any().map(move || queue.clone());

    let delta = warp::post()
        .and(warp::path("delta"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_DELTA_BYTES))
        .and(warp::body::json::<Vec<ChangeSet>>())
        .and(with_queue.clone())
        .map(handle_delta);

    let retry = warp::post()
        .and(warp::path("retry"))
        .and(warp::path::end())
        .and(warp::query::<RetryQuery>())
        .and(with_queue)
        .map(handle_retry);

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    delta.or(retry).or(health)
}

fn handle_delta(changes: Vec<ChangeSet>, queue: WorkQueue) -> warp::reply::Response {
    let subjects = scheduled_subjects(&changes);
    if subjects.is_empty() {
        tracing::debug!(change_sets = changes.len(), "no scheduled tasks in delta");
        return StatusCode::NO_CONTENT.into_response();
    }
    match queue.submit_all(subjects) {
        Ok(accepted) => {
            tracing::info!(accepted, "scheduled tasks queued");
            warp::reply::json(&json!({ "accepted": accepted })).into_response()
        }
        Err(e) => unavailable(&e),
    }
}

fn handle_retry(query: RetryQuery, queue: WorkQueue) -> warp::reply::Response {
    match queue.submit(query.task_uri.clone()) {
        Ok(()) => {
            tracing::info!(task = %query.task_uri, "task queued for retry");
            warp::reply::json(&json!({ "accepted": 1 })).into_response()
        }
        Err(e) => unavailable(&e),
    }
}

fn unavailable(error: &harvest_core::PipelineError) -> warp::reply::Response {
    tracing::error!(error = %error, "cannot queue work");
    warp::reply::with_status(
        warp::reply::json(&json!({ "error": error.to_string() })),
        StatusCode::SERVICE_UNAVAILABLE,
    )
    .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use harvest_core::vocab::{status, ADMS_STATUS};
    use harvest_core::PipelineOrchestrator;
    use harvest_test_utils::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn scheduled_delta(subject: &str) -> String {
        format!(
            r#"[{{ "inserts": [{{
                 "subject": {{"type":"uri","value":"{subject}"}},
                 "predicate": {{"type":"uri","value":"{ADMS_STATUS}"}},
                 "object": {{"type":"uri","value":"{}"}} }}],
               "deletes": [] }}]"#,
            status::SCHEDULED
        )
    }

    fn start(store: Arc<RecordingStore>, share: &TempDir) -> (WorkQueue, tokio::task::JoinHandle<()>) {
        let orchestrator =
            PipelineOrchestrator::from_config(&test_config(share.path()), store, engine()).unwrap();
        WorkQueue::start(Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let share = TempDir::new().unwrap();
        let (queue, _dispatcher) = start(Arc::new(RecordingStore::new()), &share);

        let res = warp::test::request().method("GET").path("/health").reply(&routes(queue)).await;

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn delta_without_scheduled_tasks_is_no_content() {
        let share = TempDir::new().unwrap();
        let store = Arc::new(RecordingStore::new());
        let (queue, _dispatcher) = start(store.clone(), &share);

        let res = warp::test::request()
            .method("POST")
            .path("/delta")
            .body(r#"[{"inserts":[],"deletes":[]}]"#)
            .reply(&routes(queue))
            .await;

        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn scheduled_task_in_delta_is_run() {
        let share = TempDir::new().unwrap();
        let store = Arc::new(RecordingStore::new());
        let task = TaskFixture::new(1, FILTERING);
        task.seed(store.memory());
        task.seed_graph_input(store.memory(), CONFORMING_DATA);
        let (queue, dispatcher) = start(store.clone(), &share);
        let api = routes(queue);

        let res = warp::test::request()
            .method("POST")
            .path("/delta")
            .body(scheduled_delta(&task.uri))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        drop(api);
        dispatcher.await.unwrap();
        assert_eq!(store.status_writes(status::SUCCESS), 1);
    }

    #[tokio::test]
    async fn retry_resubmits_a_failed_task() {
        let share = TempDir::new().unwrap();
        let store = Arc::new(RecordingStore::new());
        let task = TaskFixture::new(2, FILTERING).with_status(status::FAILED);
        task.seed(store.memory());
        task.seed_graph_input(store.memory(), CONFORMING_DATA);
        let (queue, dispatcher) = start(store.clone(), &share);
        let api = routes(queue);

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/retry?taskUri={}", task.uri))
            .reply(&api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        drop(api);
        dispatcher.await.unwrap();
        assert_eq!(store.status_writes(status::BUSY), 1);
        assert_eq!(store.status_writes(status::SUCCESS), 1);
    }

    #[tokio::test]
    async fn retry_requires_a_task_uri() {
        let share = TempDir::new().unwrap();
        let (queue, _dispatcher) = start(Arc::new(RecordingStore::new()), &share);

        let res = warp::test::request().method("POST").path("/retry").reply(&routes(queue)).await;

        assert!(res.status().is_client_error());
    }

    #[tokio::test]
    async fn malformed_delta_is_rejected() {
        let share = TempDir::new().unwrap();
        let (queue, _dispatcher) = start(Arc::new(RecordingStore::new()), &share);

        let res = warp::test::request()
            .method("POST")
            .path("/delta")
            .body("not json")
            .reply(&routes(queue))
            .await;

        assert!(res.status().is_client_error());
    }
}
