//! Results of collection operations

use crate::core::collection::Document;
use serde::Serialize;

/// What a successful operation produced
///
/// Serialized untagged, so `{ "data": outcome }` reads naturally:
/// a number for counts and removals, an array for reads, an object for
/// inserts and updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    /// `get` with `count`
    Count(u64),
    /// `get`
    Documents(Vec<Document>),
    /// `post`
    Inserted(Document),
    /// `put`
    Updated(UpdateSummary),
    /// `delete`
    Removed(u64),
}

/// Modification count plus the upserted document, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateSummary {
    pub count: u64,
    #[serde(rename = "newDoc", skip_serializing_if = "Option::is_none")]
    pub new_doc: Option<Document>,
}

/// `{ "data": … }` wrapper written by the default success hook
#[derive(Debug, Serialize)]
pub struct DataEnvelope<'a, T: Serialize> {
    pub data: &'a T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(serde_json::to_value(Outcome::Count(3)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(Outcome::Removed(1)).unwrap(), json!(1));
        assert_eq!(
            serde_json::to_value(Outcome::Documents(vec![])).unwrap(),
            json!([])
        );
    }

    #[test]
    fn test_update_summary_serialization() {
        let summary = Outcome::Updated(UpdateSummary {
            count: 2,
            new_doc: None,
        });
        let body = serde_json::to_value(summary).unwrap();
        assert_eq!(body, json!({ "count": 2 }));

        let mut doc = Document::new();
        doc.insert("_id".to_string(), json!("abc"));
        let summary = Outcome::Updated(UpdateSummary {
            count: 1,
            new_doc: Some(doc),
        });
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            json!({ "count": 1, "newDoc": { "_id": "abc" } })
        );
    }

    #[test]
    fn test_data_envelope() {
        let outcome = Outcome::Count(7);
        let body = serde_json::to_value(DataEnvelope { data: &outcome }).unwrap();
        assert_eq!(body, json!({ "data": 7 }));
    }
}
