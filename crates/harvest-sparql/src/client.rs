//! Store abstraction shared by every backend
//!
//! A [`GraphStore`] executes the four SPARQL operation forms the worker
//! needs. Each call carries a [`RequestContext`] with the headers to
//! forward and the endpoint to target.

use std::collections::BTreeMap;

use async_trait::async_trait;
use oxigraph::model::{Graph, NamedNode, Subject, Term, Triple};

use crate::error::StoreError;

/// Endpoint selection for a single call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endpoint {
    /// Endpoint used for writes and small reads
    #[default]
    Default,
    /// Endpoint dedicated to read-heavy paginated queries
    HighLoad,
}

/// Per-call parameters forwarded to the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Extra HTTP headers (auth/session propagation)
    pub headers: BTreeMap<String, String>,
    /// Target endpoint
    pub endpoint: Endpoint,
}

impl RequestContext {
    /// Empty context targeting the default endpoint
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace all headers
    #[inline]
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Copy of this context targeting another endpoint
    #[inline]
    #[must_use]
    pub fn on(&self, endpoint: Endpoint) -> Self {
        Self {
            headers: self.headers.clone(),
            endpoint,
        }
    }
}

/// One row of a SELECT result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    bindings: BTreeMap<String, Term>,
}

impl Solution {
    /// Build a row from `(variable, term)` pairs
    pub fn from_bindings(bindings: impl IntoIterator<Item = (String, Term)>) -> Self {
        Self {
            bindings: bindings.into_iter().collect(),
        }
    }

    /// Bound term for a variable
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.bindings.get(variable)
    }

    /// IRI bound to a variable, if it is a named node
    #[must_use]
    pub fn iri(&self, variable: &str) -> Option<&str> {
        match self.get(variable)? {
            Term::NamedNode(node) => Some(node.as_str()),
            _ => None,
        }
    }

    /// Lexical value of any bound term (IRI, literal value or blank label)
    #[must_use]
    pub fn value(&self, variable: &str) -> Option<&str> {
        match self.get(variable)? {
            Term::NamedNode(node) => Some(node.as_str()),
            Term::BlankNode(node) => Some(node.as_str()),
            Term::Literal(literal) => Some(literal.value()),
            _ => None,
        }
    }

    /// Number of bound variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when no variable is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Interpret `?s ?p ?o` bindings as a triple
    #[must_use]
    pub fn to_triple(&self) -> Option<Triple> {
        let subject = match self.get("s")? {
            Term::NamedNode(node) => Subject::NamedNode(node.clone()),
            Term::BlankNode(node) => Subject::BlankNode(node.clone()),
            _ => return None,
        };
        let predicate = match self.get("p")? {
            Term::NamedNode(node) => node.clone(),
            _ => return None,
        };
        let object = self.get("o")?.clone();
        Some(Triple::new(subject, predicate, object))
    }
}

/// Operations a triple store must support
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run an ASK query
    async fn ask(&self, query: &str, ctx: &RequestContext) -> Result<bool, StoreError>;

    /// Run a SELECT query
    async fn select(&self, query: &str, ctx: &RequestContext)
        -> Result<Vec<Solution>, StoreError>;

    /// Run a CONSTRUCT query
    async fn construct(&self, query: &str, ctx: &RequestContext) -> Result<Graph, StoreError>;

    /// Run a SPARQL update
    async fn update(&self, update: &str, ctx: &RequestContext) -> Result<(), StoreError>;

    /// Run a `SELECT ?s ?p ?o` query and collect the rows as a graph.
    ///
    /// Some proxies in front of the store do not return RDF for CONSTRUCT,
    /// so paginated reads go through SELECT.
    async fn select_graph(&self, query: &str, ctx: &RequestContext) -> Result<Graph, StoreError> {
        let rows = self.select(query, ctx).await?;
        let mut graph = Graph::new();
        for row in &rows {
            match row.to_triple() {
                Some(triple) => {
                    graph.insert(&triple);
                }
                None => {
                    return Err(StoreError::MalformedResponse(
                        "row does not bind ?s ?p ?o to a valid triple".into(),
                    ))
                }
            }
        }
        Ok(graph)
    }

    /// Insert a graph into a named graph with a single `INSERT DATA`
    async fn insert_graph(
        &self,
        graph_uri: &NamedNode,
        graph: &Graph,
        ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        let update = insert_data(graph_uri, graph);
        self.update(&update, ctx).await
    }
}

/// Render an `INSERT DATA` update for a graph
#[must_use]
pub fn insert_data(graph_uri: &NamedNode, graph: &Graph) -> String {
    let mut body = String::new();
    for triple in graph {
        body.push_str(&triple.to_string());
        body.push_str(" .\n");
    }
    format!("INSERT DATA {{ GRAPH {graph_uri} {{\n{body}}} }}")
}
