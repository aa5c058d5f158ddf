//! Value validators (sh:in, sh:hasValue, numeric ranges)

use oxigraph::model::{Literal, Term};

use super::ConstraintViolation;

/// Which range facet is being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// value >= bound
    MinInclusive,
    /// value <= bound
    MaxInclusive,
    /// value > bound
    MinExclusive,
    /// value < bound
    MaxExclusive,
}

/// Validate sh:in
#[must_use]
pub fn validate_in(value: &Term, allowed: &[Term]) -> Option<ConstraintViolation> {
    (!allowed.contains(value)).then(|| {
        ConstraintViolation::on_value(value, "Value is not in the list of allowed values".into())
    })
}

/// Validate sh:hasValue over all value nodes
#[must_use]
pub fn validate_has_value(values: &[Term], expected: &Term) -> Option<ConstraintViolation> {
    (!values.contains(expected)).then(|| {
        ConstraintViolation::without_value(format!("Missing expected value {expected}"))
    })
}

/// Validate a numeric range facet; non-numeric values always fail
#[must_use]
pub fn validate_range(value: &Term, bound: &Literal, kind: Bound) -> Option<ConstraintViolation> {
    let (Term::Literal(literal), Ok(limit)) = (value, bound.value().parse::<f64>()) else {
        return Some(ConstraintViolation::on_value(
            value,
            "Value is not comparable with the range bound".into(),
        ));
    };
    let Ok(actual) = literal.value().parse::<f64>() else {
        return Some(ConstraintViolation::on_value(
            value,
            "Value is not numeric".into(),
        ));
    };
    let ok = match kind {
        Bound::MinInclusive => actual >= limit,
        Bound::MaxInclusive => actual <= limit,
        Bound::MinExclusive => actual > limit,
        Bound::MaxExclusive => actual < limit,
    };
    (!ok).then(|| {
        ConstraintViolation::on_value(value, format!("Value is out of range ({kind:?} {limit})"))
    })
}
