//! SHACL constraint types and validators
//!
//! Each constraint is evaluated against the value nodes of one focus node and
//! yields zero or more [`ConstraintViolation`]s. Node-level structure
//! (`sh:closed`) lives in [`crate::validate`].

pub mod cardinality;
pub mod string;
pub mod value;
pub mod value_type;

use oxigraph::model::{Graph, Literal, NamedNode, NamedNodeRef, Term};
use regex::Regex;

use crate::compile::NodeKind;
use crate::vocab::sh;

/// A SHACL constraint that can be validated against value nodes
#[derive(Debug, Clone)]
pub enum Constraint {
    /// sh:minCount
    MinCount(usize),
    /// sh:maxCount
    MaxCount(usize),
    /// sh:datatype
    Datatype(NamedNode),
    /// sh:class
    Class(NamedNode),
    /// sh:nodeKind
    NodeKind(NodeKind),
    /// sh:pattern, compiled with its sh:flags
    Pattern {
        /// Source pattern as written in the shape
        source: String,
        /// Compiled regex
        regex: Regex,
    },
    /// sh:minLength
    MinLength(usize),
    /// sh:maxLength
    MaxLength(usize),
    /// sh:minInclusive
    MinInclusive(Literal),
    /// sh:maxInclusive
    MaxInclusive(Literal),
    /// sh:minExclusive
    MinExclusive(Literal),
    /// sh:maxExclusive
    MaxExclusive(Literal),
    /// sh:in
    In(Vec<Term>),
    /// sh:hasValue
    HasValue(Term),
}

/// One failed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// Offending value node, absent for cardinality-style failures
    pub value: Option<Term>,
    /// Human-readable message
    pub message: String,
}

impl ConstraintViolation {
    pub(crate) fn on_value(value: &Term, message: String) -> Self {
        Self {
            value: Some(value.clone()),
            message,
        }
    }

    pub(crate) fn without_value(message: String) -> Self {
        Self {
            value: None,
            message,
        }
    }
}

impl Constraint {
    /// `sh:sourceConstraintComponent` reported for this constraint
    #[must_use]
    pub fn component(&self) -> NamedNodeRef<'static> {
        match self {
            Self::MinCount(_) => sh::MIN_COUNT_COMPONENT,
            Self::MaxCount(_) => sh::MAX_COUNT_COMPONENT,
            Self::Datatype(_) => sh::DATATYPE_COMPONENT,
            Self::Class(_) => sh::CLASS_COMPONENT,
            Self::NodeKind(_) => sh::NODE_KIND_COMPONENT,
            Self::Pattern { .. } => sh::PATTERN_COMPONENT,
            Self::MinLength(_) => sh::MIN_LENGTH_COMPONENT,
            Self::MaxLength(_) => sh::MAX_LENGTH_COMPONENT,
            Self::MinInclusive(_) => sh::MIN_INCLUSIVE_COMPONENT,
            Self::MaxInclusive(_) => sh::MAX_INCLUSIVE_COMPONENT,
            Self::MinExclusive(_) => sh::MIN_EXCLUSIVE_COMPONENT,
            Self::MaxExclusive(_) => sh::MAX_EXCLUSIVE_COMPONENT,
            Self::In(_) => sh::IN_COMPONENT,
            Self::HasValue(_) => sh::HAS_VALUE_COMPONENT,
        }
    }

    /// Evaluate against the value nodes of one focus node
    #[must_use]
    pub fn evaluate(&self, values: &[Term], data: &Graph) -> Vec<ConstraintViolation> {
        match self {
            Self::MinCount(min) => cardinality::validate_min_count(values, *min)
                .into_iter()
                .collect(),
            Self::MaxCount(max) => cardinality::validate_max_count(values, *max)
                .into_iter()
                .collect(),
            Self::HasValue(expected) => value::validate_has_value(values, expected)
                .into_iter()
                .collect(),
            _ => values
                .iter()
                .filter_map(|v| self.evaluate_value(v, data))
                .collect(),
        }
    }

    fn evaluate_value(&self, value: &Term, data: &Graph) -> Option<ConstraintViolation> {
        match self {
            Self::Datatype(dt) => value_type::validate_datatype(value, dt.as_ref()),
            Self::Class(class) => value_type::validate_class(value, class.as_ref(), data),
            Self::NodeKind(kind) => value_type::validate_node_kind(value, *kind),
            Self::Pattern { source, regex } => string::validate_pattern(value, source, regex),
            Self::MinLength(min) => string::validate_min_length(value, *min),
            Self::MaxLength(max) => string::validate_max_length(value, *max),
            Self::MinInclusive(bound) => value::validate_range(value, bound, value::Bound::MinInclusive),
            Self::MaxInclusive(bound) => value::validate_range(value, bound, value::Bound::MaxInclusive),
            Self::MinExclusive(bound) => value::validate_range(value, bound, value::Bound::MinExclusive),
            Self::MaxExclusive(bound) => value::validate_range(value, bound, value::Bound::MaxExclusive),
            Self::In(allowed) => value::validate_in(value, allowed),
            Self::MinCount(_) | Self::MaxCount(_) | Self::HasValue(_) => None,
        }
    }
}

/// Lexical form of an IRI or literal; blank nodes have none
pub(crate) fn lexical(value: &Term) -> Option<&str> {
    match value {
        Term::NamedNode(node) => Some(node.as_str()),
        Term::Literal(literal) => Some(literal.value()),
        _ => None,
    }
}
