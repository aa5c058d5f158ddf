use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use harvest_sparql::{Endpoint, GraphStore, MemoryStore, RequestContext, Solution, StoreError};
use oxigraph::model::Graph;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ask(String),
    Select { query: String, endpoint: Endpoint },
    Construct(String),
    Update(String),
}

/// [`MemoryStore`] wrapper that records every call and can fail inserts on demand.
#[derive(Debug)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    failing_graphs: Mutex<HashSet<String>>,
    failing_updates: Mutex<Vec<String>>,
    fail_next_inserts: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::wrap(MemoryStore::new().unwrap())
    }

    pub fn wrap(inner: MemoryStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failing_graphs: Mutex::new(HashSet::new()),
            failing_updates: Mutex::new(Vec::new()),
            fail_next_inserts: AtomicUsize::new(0),
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    /// Every `INSERT DATA` into `graph` fails from now on
    pub fn fail_inserts_into(&self, graph: &str) {
        self.failing_graphs.lock().insert(graph.to_string());
    }

    /// Every update whose text contains `needle` fails from now on
    pub fn fail_updates_containing(&self, needle: &str) {
        self.failing_updates.lock().push(needle.to_string());
    }

    /// The next `n` `INSERT DATA` calls into any graph fail
    pub fn fail_next_inserts(&self, n: usize) {
        self.fail_next_inserts.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn updates(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Update(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    /// `INSERT DATA` calls targeting `graph`, failed ones included
    pub fn insert_attempts_into(&self, graph: &str) -> usize {
        let prefix = format!("INSERT DATA {{ GRAPH <{graph}> {{");
        self.updates().iter().filter(|u| u.starts_with(&prefix)).count()
    }

    /// Status writes setting `status_iri`
    pub fn status_writes(&self, status_iri: &str) -> usize {
        let needle = format!("adms:status <{status_iri}>");
        self.updates().iter().filter(|u| u.contains(&needle)).count()
    }

    /// Status writes of any value
    pub fn all_status_writes(&self) -> usize {
        self.updates()
            .iter()
            .filter(|u| u.contains("DELETE") && u.contains("adms:status ?status"))
            .count()
    }

    /// Error records appended
    pub fn error_appends(&self) -> usize {
        self.updates().iter().filter(|u| u.contains("a oslc:Error")).count()
    }

    pub fn selects_on(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Select { endpoint: e, .. } if *e == endpoint))
            .count()
    }

    fn should_fail(&self, update: &str) -> bool {
        if self.failing_updates.lock().iter().any(|n| update.contains(n.as_str())) {
            return true;
        }
        let Some(rest) = update.strip_prefix("INSERT DATA { GRAPH <") else {
            return false;
        };
        let graph = rest.split('>').next().unwrap_or_default();
        if self.failing_graphs.lock().contains(graph) {
            return true;
        }
        self.fail_next_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for RecordingStore {
    async fn ask(&self, query: &str, ctx: &RequestContext) -> Result<bool, StoreError> {
        self.calls.lock().push(Call::Ask(query.to_string()));
        self.inner.ask(query, ctx).await
    }

    async fn select(&self, query: &str, ctx: &RequestContext) -> Result<Vec<Solution>, StoreError> {
        self.calls.lock().push(Call::Select {
            query: query.to_string(),
            endpoint: ctx.endpoint,
        });
        self.inner.select(query, ctx).await
    }

    async fn construct(&self, query: &str, ctx: &RequestContext) -> Result<Graph, StoreError> {
        self.calls.lock().push(Call::Construct(query.to_string()));
        self.inner.construct(query, ctx).await
    }

    async fn update(&self, update: &str, ctx: &RequestContext) -> Result<(), StoreError> {
        self.calls.lock().push(Call::Update(update.to_string()));
        if self.should_fail(update) {
            return Err(StoreError::Transport("injected update failure".into()));
        }
        self.inner.update(update, ctx).await
    }
}
