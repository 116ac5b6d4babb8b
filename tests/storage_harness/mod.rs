//! Shared test harness for storage backend testing
//!
//! Provides document builders and two test-suite macros that every
//! `Collection` backend runs:
//!
//! - `collection_tests!` validates the `Collection` contract directly
//! - `rest_integration_tests!` drives the same backend through HTTP
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! collection_tests!(InMemoryCollection::new());
//! rest_integration_tests!(InMemoryCollection::new());
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod collection_tests;
#[macro_use]
pub mod rest_tests;

use collection_rest::core::{Document, Filter, fix_pattern_filters};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helper functions: documents and filters
// ---------------------------------------------------------------------------

/// Build a document from a JSON object literal.
pub fn doc(value: Value) -> Document {
    value
        .as_object()
        .cloned()
        .expect("test document must be a JSON object")
}

/// Compile a JSON filter the way the request translator does.
pub fn filter(value: Value) -> Filter {
    fix_pattern_filters(Some(&value)).expect("test filter must compile")
}

/// A person document with a name, an age and an active flag.
pub fn person(name: &str, age: i64, active: bool) -> Document {
    doc(json!({ "name": name, "age": age, "active": active }))
}

/// Generate `n` people: `person_0`, `person_1`, ... with ages 20, 21, ...
/// and alternating active flags.
pub fn sample_batch(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| person(&format!("person_{}", i), 20 + i as i64, i % 2 == 0))
        .collect()
}

/// The `name` field of every document, in order.
pub fn names(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .filter_map(|d| d.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}
