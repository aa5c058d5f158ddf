//! SHACL vocabulary

pub use oxigraph::model::vocab::{rdf, rdfs, xsd};

/// `http://www.w3.org/ns/shacl#` terms used by the engine
pub mod sh {
    use oxigraph::model::NamedNodeRef;

    macro_rules! sh_terms {
        ($($name:ident => $local:literal),* $(,)?) => {
            $(
                #[allow(missing_docs)]
                pub const $name: NamedNodeRef<'_> =
                    NamedNodeRef::new_unchecked(concat!("http://www.w3.org/ns/shacl#", $local));
            )*
        };
    }

    sh_terms! {
        NODE_SHAPE => "NodeShape",
        PROPERTY_SHAPE => "PropertyShape",
        PROPERTY => "property",
        PATH => "path",
        INVERSE_PATH => "inversePath",
        TARGET_CLASS => "targetClass",
        TARGET_NODE => "targetNode",
        TARGET_SUBJECTS_OF => "targetSubjectsOf",
        TARGET_OBJECTS_OF => "targetObjectsOf",
        DEACTIVATED => "deactivated",
        SEVERITY => "severity",
        MESSAGE => "message",
        NAME => "name",

        MIN_COUNT => "minCount",
        MAX_COUNT => "maxCount",
        DATATYPE => "datatype",
        CLASS => "class",
        NODE_KIND => "nodeKind",
        PATTERN => "pattern",
        FLAGS => "flags",
        MIN_LENGTH => "minLength",
        MAX_LENGTH => "maxLength",
        MIN_INCLUSIVE => "minInclusive",
        MAX_INCLUSIVE => "maxInclusive",
        MIN_EXCLUSIVE => "minExclusive",
        MAX_EXCLUSIVE => "maxExclusive",
        IN => "in",
        HAS_VALUE => "hasValue",
        CLOSED => "closed",
        IGNORED_PROPERTIES => "ignoredProperties",

        IRI => "IRI",
        BLANK_NODE => "BlankNode",
        LITERAL => "Literal",
        BLANK_NODE_OR_IRI => "BlankNodeOrIRI",
        BLANK_NODE_OR_LITERAL => "BlankNodeOrLiteral",
        IRI_OR_LITERAL => "IRIOrLiteral",

        VIOLATION => "Violation",
        WARNING => "Warning",
        INFO => "Info",

        VALIDATION_REPORT => "ValidationReport",
        VALIDATION_RESULT => "ValidationResult",
        CONFORMS => "conforms",
        RESULT => "result",
        FOCUS_NODE => "focusNode",
        RESULT_PATH => "resultPath",
        VALUE => "value",
        RESULT_MESSAGE => "resultMessage",
        RESULT_SEVERITY => "resultSeverity",
        SOURCE_SHAPE => "sourceShape",
        SOURCE_CONSTRAINT_COMPONENT => "sourceConstraintComponent",

        MIN_COUNT_COMPONENT => "MinCountConstraintComponent",
        MAX_COUNT_COMPONENT => "MaxCountConstraintComponent",
        DATATYPE_COMPONENT => "DatatypeConstraintComponent",
        CLASS_COMPONENT => "ClassConstraintComponent",
        NODE_KIND_COMPONENT => "NodeKindConstraintComponent",
        PATTERN_COMPONENT => "PatternConstraintComponent",
        MIN_LENGTH_COMPONENT => "MinLengthConstraintComponent",
        MAX_LENGTH_COMPONENT => "MaxLengthConstraintComponent",
        MIN_INCLUSIVE_COMPONENT => "MinInclusiveConstraintComponent",
        MAX_INCLUSIVE_COMPONENT => "MaxInclusiveConstraintComponent",
        MIN_EXCLUSIVE_COMPONENT => "MinExclusiveConstraintComponent",
        MAX_EXCLUSIVE_COMPONENT => "MaxExclusiveConstraintComponent",
        IN_COMPONENT => "InConstraintComponent",
        HAS_VALUE_COMPONENT => "HasValueConstraintComponent",
        CLOSED_COMPONENT => "ClosedConstraintComponent",
    }
}
