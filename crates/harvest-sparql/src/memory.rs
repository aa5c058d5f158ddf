//! Embedded in-memory store
//!
//! Backed by an oxigraph [`Store`]. Used for local runs and by the test
//! suites; headers and endpoint selection are accepted and ignored.

use async_trait::async_trait;
use oxigraph::model::{Graph, GraphNameRef, NamedNodeRef, Quad, Triple};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::client::{GraphStore, RequestContext, Solution};
use crate::error::StoreError;

/// In-memory SPARQL store
#[derive(Clone)]
pub struct MemoryStore {
    store: Store,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Result<Self, StoreError> {
        let store = Store::new().map_err(|e| StoreError::Evaluation(e.to_string()))?;
        Ok(Self { store })
    }

    /// Load triples into a named graph
    pub fn load_graph(&self, graph_uri: NamedNodeRef<'_>, graph: &Graph) -> Result<(), StoreError> {
        let graph_name = GraphNameRef::NamedNode(graph_uri);
        for triple in graph {
            let quad = Quad::new(
                triple.subject.into_owned(),
                triple.predicate.into_owned(),
                triple.object.into_owned(),
                graph_name.into_owned(),
            );
            self.store
                .insert(&quad)
                .map_err(|e| StoreError::Evaluation(e.to_string()))?;
        }
        Ok(())
    }

    /// Triples of one named graph
    pub fn graph(&self, graph_uri: NamedNodeRef<'_>) -> Result<Graph, StoreError> {
        let mut graph = Graph::new();
        for quad in self
            .store
            .quads_for_pattern(None, None, None, Some(GraphNameRef::NamedNode(graph_uri)))
        {
            let quad = quad.map_err(|e| StoreError::Evaluation(e.to_string()))?;
            graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(graph)
    }

    /// Total number of quads
    pub fn len(&self) -> Result<usize, StoreError> {
        self.store
            .len()
            .map_err(|e| StoreError::Evaluation(e.to_string()))
    }

    /// True when the store holds no quad
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        self.store
            .is_empty()
            .map_err(|e| StoreError::Evaluation(e.to_string()))
    }

    fn run(&self, query: &str) -> Result<QueryResults, StoreError> {
        self.store
            .query(query)
            .map_err(|e| StoreError::Evaluation(e.to_string()))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn ask(&self, query: &str, _ctx: &RequestContext) -> Result<bool, StoreError> {
        match self.run(query)? {
            QueryResults::Boolean(value) => Ok(value),
            _ => Err(StoreError::UnexpectedResultForm {
                expected: "boolean",
            }),
        }
    }

    async fn select(
        &self,
        query: &str,
        _ctx: &RequestContext,
    ) -> Result<Vec<Solution>, StoreError> {
        let QueryResults::Solutions(solutions) = self.run(query)? else {
            return Err(StoreError::UnexpectedResultForm {
                expected: "solutions",
            });
        };
        let mut rows = Vec::new();
        for solution in solutions {
            let solution = solution.map_err(|e| StoreError::Evaluation(e.to_string()))?;
            rows.push(Solution::from_bindings(
                solution
                    .iter()
                    .map(|(var, term)| (var.as_str().to_string(), term.clone())),
            ));
        }
        Ok(rows)
    }

    async fn construct(&self, query: &str, _ctx: &RequestContext) -> Result<Graph, StoreError> {
        let QueryResults::Graph(triples) = self.run(query)? else {
            return Err(StoreError::UnexpectedResultForm { expected: "graph" });
        };
        let mut graph = Graph::new();
        for triple in triples {
            let triple = triple.map_err(|e| StoreError::Evaluation(e.to_string()))?;
            graph.insert(&triple);
        }
        Ok(graph)
    }

    async fn update(&self, update: &str, _ctx: &RequestContext) -> Result<(), StoreError> {
        self.store
            .update(update)
            .map_err(|e| StoreError::Evaluation(e.to_string()))
    }
}
