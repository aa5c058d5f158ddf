//! SPARQL 1.1 Query Results JSON decoding

use std::collections::BTreeMap;

use oxigraph::model::{BlankNode, Literal, NamedNode, Term};
use serde::Deserialize;

use crate::client::Solution;
use crate::error::StoreError;

#[derive(Debug, Deserialize)]
struct ResultsDocument {
    #[serde(default)]
    boolean: Option<bool>,
    #[serde(default)]
    results: Option<ResultsBody>,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    #[serde(default)]
    bindings: Vec<BTreeMap<String, JsonTerm>>,
}

#[derive(Debug, Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(default)]
    datatype: Option<String>,
    #[serde(default, rename = "xml:lang")]
    lang: Option<String>,
}

impl JsonTerm {
    fn into_term(self) -> Result<Term, StoreError> {
        match self.kind.as_str() {
            "uri" => NamedNode::new(self.value)
                .map(Term::from)
                .map_err(|e| StoreError::MalformedResponse(e.to_string())),
            "bnode" => Ok(Term::from(blank_node(&self.value))),
            "literal" | "typed-literal" => literal(self.value, self.datatype, self.lang),
            other => Err(StoreError::MalformedResponse(format!(
                "unknown term type '{other}'"
            ))),
        }
    }
}

fn literal(
    value: String,
    datatype: Option<String>,
    lang: Option<String>,
) -> Result<Term, StoreError> {
    if let Some(lang) = lang {
        return Literal::new_language_tagged_literal(value, lang)
            .map(Term::from)
            .map_err(|e| StoreError::MalformedResponse(e.to_string()));
    }
    match datatype {
        Some(datatype) => {
            let datatype = NamedNode::new(datatype)
                .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
            Ok(Term::from(Literal::new_typed_literal(value, datatype)))
        }
        None => Ok(Term::from(Literal::new_simple_literal(value))),
    }
}

/// Map an arbitrary store-issued blank label (e.g. `nodeID://b1001`) to a
/// valid blank node with a stable label.
fn blank_node(label: &str) -> BlankNode {
    let sanitized: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let sanitized = if sanitized.is_empty() {
        "b".to_string()
    } else if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        format!("b{sanitized}")
    } else {
        sanitized
    };
    BlankNode::new(sanitized).unwrap_or_default()
}

/// Decode a SELECT response body
pub(crate) fn parse_solutions(body: &[u8]) -> Result<Vec<Solution>, StoreError> {
    let doc: ResultsDocument =
        serde_json::from_slice(body).map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
    let Some(results) = doc.results else {
        return Err(StoreError::UnexpectedResultForm {
            expected: "solutions",
        });
    };
    results
        .bindings
        .into_iter()
        .map(|row| {
            let bindings = row
                .into_iter()
                .map(|(var, term)| Ok((var, term.into_term()?)))
                .collect::<Result<Vec<_>, StoreError>>()?;
            Ok(Solution::from_bindings(bindings))
        })
        .collect()
}

/// Decode an ASK response body
pub(crate) fn parse_boolean(body: &[u8]) -> Result<bool, StoreError> {
    let doc: ResultsDocument =
        serde_json::from_slice(body).map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
    doc.boolean.ok_or(StoreError::UnexpectedResultForm {
        expected: "boolean",
    })
}
