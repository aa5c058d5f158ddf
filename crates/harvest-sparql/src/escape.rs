//! Escaping helpers for values substituted into query templates

use oxigraph::model::{Literal, NamedNode};

use crate::error::StoreError;

/// `<iri>` after checking the IRI is well formed
pub fn iri(value: &str) -> Result<String, StoreError> {
    NamedNode::new(value)
        .map(|node| node.to_string())
        .map_err(|e| StoreError::InvalidIri {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Quoted string literal with SPARQL escapes applied
#[must_use]
pub fn string_literal(value: &str) -> String {
    Literal::new_simple_literal(value).to_string()
}

/// Typed literal, e.g. `"42"^^<http://www.w3.org/2001/XMLSchema#integer>`
#[must_use]
pub fn typed_literal(value: &str, datatype: &str) -> String {
    Literal::new_typed_literal(value, NamedNode::new_unchecked(datatype)).to_string()
}
