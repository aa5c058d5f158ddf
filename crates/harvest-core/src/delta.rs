//! Delta notification payloads
//!
//! The notifier posts a JSON array of change sets:
//!
//! ```json
//! [{ "inserts": [{ "subject": { "type": "uri", "value": "..." }, ... }], "deletes": [] }]
//! ```

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::vocab::{status, ADMS_STATUS};

/// One RDF term of a delta triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaTerm {
    /// `uri`, `literal`, `typed-literal` or `bnode`
    #[serde(rename = "type")]
    pub kind: String,
    /// Lexical value
    pub value: String,
    /// Datatype of typed literals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

/// One inserted or deleted triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaTriple {
    /// Subject
    pub subject: DeltaTerm,
    /// Predicate
    pub predicate: DeltaTerm,
    /// Object
    pub object: DeltaTerm,
}

/// Triples inserted and deleted in one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Inserted triples
    #[serde(default)]
    pub inserts: Vec<DeltaTriple>,
    /// Deleted triples
    #[serde(default)]
    pub deletes: Vec<DeltaTriple>,
}

/// Subjects whose `predicate` was inserted with value `object`, in first-seen
/// order and without duplicates
#[must_use]
pub fn inserted_subjects(changes: &[ChangeSet], predicate: &str, object: &str) -> Vec<String> {
    let subjects: IndexSet<&str> = changes
        .iter()
        .flat_map(|change| &change.inserts)
        .filter(|t| t.predicate.value == predicate && t.object.value == object)
        .map(|t| t.subject.value.as_str())
        .collect();
    subjects.into_iter().map(str::to_string).collect()
}

/// Subjects that became scheduled
#[must_use]
pub fn scheduled_subjects(changes: &[ChangeSet]) -> Vec<String> {
    inserted_subjects(changes, ADMS_STATUS, status::SCHEDULED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload() -> Vec<ChangeSet> {
        serde_json::from_str(&format!(
            r#"[
              {{ "inserts": [
                  {{ "subject": {{"type":"uri","value":"http://ex.org/t2"}},
                     "predicate": {{"type":"uri","value":"{ADMS_STATUS}"}},
                     "object": {{"type":"uri","value":"{scheduled}"}} }},
                  {{ "subject": {{"type":"uri","value":"http://ex.org/t1"}},
                     "predicate": {{"type":"uri","value":"{ADMS_STATUS}"}},
                     "object": {{"type":"uri","value":"{scheduled}"}} }},
                  {{ "subject": {{"type":"uri","value":"http://ex.org/t3"}},
                     "predicate": {{"type":"uri","value":"{ADMS_STATUS}"}},
                     "object": {{"type":"uri","value":"{busy}"}} }}
                ],
                "deletes": [
                  {{ "subject": {{"type":"uri","value":"http://ex.org/t4"}},
                     "predicate": {{"type":"uri","value":"{ADMS_STATUS}"}},
                     "object": {{"type":"uri","value":"{scheduled}"}} }}
                ] }},
              {{ "inserts": [
                  {{ "subject": {{"type":"uri","value":"http://ex.org/t2"}},
                     "predicate": {{"type":"uri","value":"{ADMS_STATUS}"}},
                     "object": {{"type":"uri","value":"{scheduled}"}} }}
                ] }}
            ]"#,
            scheduled = status::SCHEDULED,
            busy = status::BUSY,
        ))
        .unwrap()
    }

    #[test]
    fn keeps_first_seen_order_without_duplicates() {
        assert_eq!(
            scheduled_subjects(&payload()),
            vec!["http://ex.org/t2".to_string(), "http://ex.org/t1".to_string()]
        );
    }

    #[test]
    fn empty_payload_yields_nothing() {
        assert!(scheduled_subjects(&[]).is_empty());
        let changes: Vec<ChangeSet> = serde_json::from_str(r#"[{"inserts":[],"deletes":[]}]"#).unwrap();
        assert!(scheduled_subjects(&changes).is_empty());
    }
}
