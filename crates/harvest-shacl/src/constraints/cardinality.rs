//! Cardinality constraint validators (sh:minCount, sh:maxCount)

use oxigraph::model::Term;

use super::ConstraintViolation;

/// Validate sh:minCount
#[must_use]
pub fn validate_min_count(values: &[Term], min: usize) -> Option<ConstraintViolation> {
    (values.len() < min).then(|| {
        ConstraintViolation::without_value(format!(
            "Expected at least {min} value(s) but found {}",
            values.len()
        ))
    })
}

/// Validate sh:maxCount
#[must_use]
pub fn validate_max_count(values: &[Term], max: usize) -> Option<ConstraintViolation> {
    (values.len() > max).then(|| {
        ConstraintViolation::without_value(format!(
            "Expected at most {max} value(s) but found {}",
            values.len()
        ))
    })
}
