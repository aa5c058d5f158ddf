//! String-based validators (sh:pattern, sh:minLength, sh:maxLength)

use oxigraph::model::Term;
use regex::Regex;

use super::{lexical, ConstraintViolation};
use crate::error::{Result, ShaclError};

/// Compile `sh:pattern` with optional `sh:flags` (`i`, `m`, `s`, `x`)
pub fn compile_pattern(pattern: &str, flags: Option<&str>) -> Result<Regex> {
    let flags: String = flags
        .unwrap_or_default()
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
        .collect();
    let source = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{flags}){pattern}")
    };
    Regex::new(&source).map_err(|e| ShaclError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Validate sh:pattern
#[must_use]
pub fn validate_pattern(value: &Term, source: &str, regex: &Regex) -> Option<ConstraintViolation> {
    match lexical(value) {
        Some(text) if regex.is_match(text) => None,
        _ => Some(ConstraintViolation::on_value(
            value,
            format!("Value does not match pattern \"{source}\""),
        )),
    }
}

/// Validate sh:minLength
#[must_use]
pub fn validate_min_length(value: &Term, min: usize) -> Option<ConstraintViolation> {
    match lexical(value) {
        Some(text) if text.chars().count() >= min => None,
        _ => Some(ConstraintViolation::on_value(
            value,
            format!("Value has less than {min} characters"),
        )),
    }
}

/// Validate sh:maxLength
#[must_use]
pub fn validate_max_length(value: &Term, max: usize) -> Option<ConstraintViolation> {
    match lexical(value) {
        Some(text) if text.chars().count() <= max => None,
        _ => Some(ConstraintViolation::on_value(
            value,
            format!("Value has more than {max} characters"),
        )),
    }
}
