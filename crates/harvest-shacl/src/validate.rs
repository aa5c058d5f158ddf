//! Focus node selection and constraint evaluation

use std::collections::BTreeMap;

use oxigraph::model::{Graph, Term, TermRef};

use crate::compile::{CompiledShape, PropertyPath, PropertyShape, TargetType};
use crate::constraints::value_type::is_instance_of;
use crate::constraints::{Constraint, ConstraintViolation};
use crate::rdf::{as_subject_ref, subject_term};
use crate::report::{ValidationReport, ValidationResult};
use crate::vocab::{rdf, sh};

/// Validate a data graph against compiled shapes
#[must_use]
pub fn validate(shapes: &[CompiledShape], data: &Graph) -> ValidationReport {
    let mut results = Vec::new();
    for shape in shapes {
        for focus in focus_nodes(shape, data) {
            validate_focus(shape, &focus, data, &mut results);
        }
    }
    ValidationReport::from_results(results)
}

/// Focus nodes of a shape, de-duplicated and in a stable order
pub(crate) fn focus_nodes(shape: &CompiledShape, data: &Graph) -> Vec<Term> {
    let mut nodes: BTreeMap<String, Term> = BTreeMap::new();
    let mut add = |term: Term| {
        nodes.entry(term.to_string()).or_insert(term);
    };
    for target in &shape.targets {
        match target {
            TargetType::Class(class) => {
                for triple in data.triples_for_predicate(rdf::TYPE) {
                    if is_instance_of(data, triple.subject, class.as_ref()) {
                        add(subject_term(triple.subject));
                    }
                }
            }
            TargetType::Node(node) => add(node.clone()),
            TargetType::SubjectsOf(p) => {
                for triple in data.triples_for_predicate(p) {
                    add(subject_term(triple.subject));
                }
            }
            TargetType::ObjectsOf(p) => {
                for triple in data.triples_for_predicate(p) {
                    add(triple.object.into_owned());
                }
            }
        }
    }
    nodes.into_values().collect()
}

fn validate_focus(
    shape: &CompiledShape,
    focus: &Term,
    data: &Graph,
    results: &mut Vec<ValidationResult>,
) {
    let self_value = std::slice::from_ref(focus);
    for constraint in &shape.node_constraints {
        for violation in constraint.evaluate(self_value, data) {
            results.push(ValidationResult {
                focus_node: focus.clone(),
                result_path: None,
                value: violation.value,
                message: shape.message.clone().unwrap_or(violation.message),
                severity: shape.severity,
                source_constraint: constraint.component().into_owned(),
                source_shape: shape.id.clone(),
            });
        }
    }

    for property in &shape.property_shapes {
        validate_property(property, focus, data, results);
    }

    if let (Some(closed), Some(subject)) = (&shape.closed, as_subject_ref(focus.as_ref())) {
        for triple in data.triples_for_subject(subject) {
            let predicate = triple.predicate.into_owned();
            if closed.allowed.contains(&predicate) {
                continue;
            }
            results.push(ValidationResult {
                focus_node: focus.clone(),
                value: Some(triple.object.into_owned()),
                message: shape
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Predicate {predicate} is not allowed (closed shape)")),
                result_path: Some(PropertyPath::Predicate(predicate)),
                severity: shape.severity,
                source_constraint: sh::CLOSED_COMPONENT.into_owned(),
                source_shape: shape.id.clone(),
            });
        }
    }
}

fn validate_property(
    property: &PropertyShape,
    focus: &Term,
    data: &Graph,
    results: &mut Vec<ValidationResult>,
) {
    let values = path_values(&property.path, focus, data);
    for constraint in &property.constraints {
        for ConstraintViolation { value, message } in constraint.evaluate(&values, data) {
            results.push(ValidationResult {
                focus_node: focus.clone(),
                result_path: Some(property.path.clone()),
                value,
                message: property.message.clone().unwrap_or(message),
                severity: property.severity,
                source_constraint: Constraint::component(constraint).into_owned(),
                source_shape: property.id.clone(),
            });
        }
    }
}

/// Value nodes reached from `focus` through `path`
pub(crate) fn path_values(path: &PropertyPath, focus: &Term, data: &Graph) -> Vec<Term> {
    match path {
        PropertyPath::Predicate(p) => match as_subject_ref(focus.as_ref()) {
            Some(subject) => data
                .objects_for_subject_predicate(subject, p)
                .map(TermRef::into_owned)
                .collect(),
            None => Vec::new(),
        },
        PropertyPath::Inverse(p) => data
            .subjects_for_predicate_object(p, focus)
            .map(subject_term)
            .collect(),
    }
}
