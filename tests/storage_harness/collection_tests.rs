//! Macro-generated test suite for `Collection` contract validation.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use collection_rest::storage::InMemoryCollection;
//!
//! collection_tests!(InMemoryCollection::new());
//! ```
//!
//! # Generated Tests
//!
//! ## Insert
//! - `test_insert_generates_id`: inserted document comes back with an `_id`
//! - `test_insert_duplicate_id`: second insert with the same `_id` fails
//!
//! ## Count / Find
//! - `test_count_empty_and_filtered`: empty filter, equality, comparison
//! - `test_pattern_filter`: compiled `$regex` matches like a native predicate
//! - `test_find_sort_skip_limit`: cursor options applied together
//! - `test_find_projection`: inclusion and exclusion projections
//!
//! ## Update / Remove
//! - `test_update_first_and_multi`: `multi` controls how many documents change
//! - `test_upsert_inserts`: `upsert` with no match inserts and returns the document
//! - `test_update_mixed_is_error`: modifiers mixed with plain fields are rejected
//! - `test_remove_first_and_multi`: `multi` controls how many documents go
//!
//! ## Edge Cases
//! - `test_concurrent_inserts`: parallel inserts from spawned tasks

/// Generate a full `Collection` conformance test suite.
///
/// `$factory` must be an expression evaluating to an empty collection. It is
/// re-evaluated for each test. For the concurrent test the collection must
/// also be `Clone + 'static`.
#[macro_export]
macro_rules! collection_tests {
    ($factory:expr) => {
        mod collection_contract_tests {
            use super::*;
            use collection_rest::core::{
                Collection, Cursor, Filter, Projection, RemoveOptions, SortDirection, SortSpec,
                UpdateOptions,
            };
            use serde_json::json;

            async fn seeded(n: usize) -> impl Collection + Clone + 'static {
                let collection = $factory;
                for doc in sample_batch(n) {
                    collection.insert(doc).await.unwrap();
                }
                collection
            }

            fn by_age() -> SortSpec {
                SortSpec::new().with("age", SortDirection::Ascending)
            }

            // ==================================================================
            // Insert
            // ==================================================================

            #[tokio::test]
            async fn test_insert_generates_id() {
                let collection = $factory;

                let inserted = collection.insert(person("alice", 30, true)).await.unwrap();
                assert_eq!(inserted["name"], "alice");
                assert!(inserted.contains_key("_id"), "inserted document should carry an _id");

                assert_eq!(collection.count(&Filter::empty()).await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_insert_duplicate_id() {
                let collection = $factory;
                let document = doc(json!({ "_id": "fixed", "name": "alice" }));

                collection.insert(document.clone()).await.unwrap();
                assert!(collection.insert(document).await.is_err());
                assert_eq!(collection.count(&Filter::empty()).await.unwrap(), 1);
            }

            // ==================================================================
            // Count / Find
            // ==================================================================

            #[tokio::test]
            async fn test_count_empty_and_filtered() {
                let collection = seeded(6).await;

                assert_eq!(collection.count(&Filter::empty()).await.unwrap(), 6);
                assert_eq!(collection.count(&filter(json!({ "active": true }))).await.unwrap(), 3);
                assert_eq!(
                    collection.count(&filter(json!({ "age": { "$gte": 23 } }))).await.unwrap(),
                    3
                );
                assert_eq!(
                    collection
                        .count(&filter(json!({ "name": { "$in": ["person_0", "person_5", "nobody"] } })))
                        .await
                        .unwrap(),
                    2
                );
            }

            #[tokio::test]
            async fn test_pattern_filter() {
                let collection = $factory;
                for name in ["alice", "amy", "bob", "Anna"] {
                    collection.insert(person(name, 30, true)).await.unwrap();
                }

                let pattern = filter(json!({ "name": { "$regex": "^a" } }));
                assert_eq!(collection.count(&pattern).await.unwrap(), 2);

                let insensitive = filter(json!({ "name": { "$regex": "^a", "$options": "i" } }));
                assert_eq!(collection.count(&insensitive).await.unwrap(), 3);

                // The marker string itself is never compared literally
                assert_eq!(collection.count(&filter(json!({ "name": "^a" }))).await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_find_sort_skip_limit() {
                let collection = seeded(5).await;

                let cursor = Cursor::new(Filter::empty(), None).skip(1).limit(2).sort(by_age());
                let docs = collection.find(cursor).await.unwrap();
                assert_eq!(names(&docs), vec!["person_1", "person_2"]);

                let cursor = Cursor::new(Filter::empty(), None)
                    .limit(1)
                    .sort(SortSpec::new().with("age", SortDirection::Descending));
                let docs = collection.find(cursor).await.unwrap();
                assert_eq!(names(&docs), vec!["person_4"]);
            }

            #[tokio::test]
            async fn test_find_projection() {
                let collection = seeded(2).await;

                let include = Projection::new().with("name", true);
                let docs = collection
                    .find(Cursor::new(Filter::empty(), Some(include)).sort(by_age()))
                    .await
                    .unwrap();
                assert_eq!(docs.len(), 2);
                assert!(docs[0].contains_key("name"));
                assert!(docs[0].contains_key("_id"));
                assert!(!docs[0].contains_key("age"));

                let exclude = Projection::new().with("age", false).with("_id", false);
                let docs = collection
                    .find(Cursor::new(filter(json!({ "name": "person_0" })), Some(exclude)))
                    .await
                    .unwrap();
                assert_eq!(docs, vec![doc(json!({ "name": "person_0", "active": true }))]);
            }

            // ==================================================================
            // Update / Remove
            // ==================================================================

            #[tokio::test]
            async fn test_update_first_and_multi() {
                let collection = seeded(4).await;
                let active = filter(json!({ "active": true }));
                let tag = doc(json!({ "$set": { "tag": "x" } }));

                let result = collection.update(&active, &tag, UpdateOptions::default()).await.unwrap();
                assert_eq!(result.count, 1);
                assert_eq!(collection.count(&filter(json!({ "tag": "x" }))).await.unwrap(), 1);

                let multi = UpdateOptions { upsert: false, multi: true };
                let result = collection.update(&active, &tag, multi).await.unwrap();
                assert_eq!(result.count, 2);
                assert!(result.upserted.is_none());
                assert_eq!(collection.count(&filter(json!({ "tag": "x" }))).await.unwrap(), 2);
            }

            #[tokio::test]
            async fn test_upsert_inserts() {
                let collection = seeded(2).await;
                let upsert = UpdateOptions { upsert: true, multi: false };

                let result = collection
                    .update(
                        &filter(json!({ "name": "zoe" })),
                        &doc(json!({ "$set": { "age": 40 } })),
                        upsert,
                    )
                    .await
                    .unwrap();

                assert_eq!(result.count, 1);
                let inserted = result.upserted.expect("upsert should return the new document");
                assert_eq!(inserted["name"], "zoe");
                assert_eq!(inserted["age"], 40);
                assert_eq!(collection.count(&Filter::empty()).await.unwrap(), 3);
            }

            #[tokio::test]
            async fn test_update_mixed_is_error() {
                let collection = seeded(1).await;
                let mixed = doc(json!({ "$set": { "a": 1 }, "b": 2 }));

                let result = collection.update(&Filter::empty(), &mixed, UpdateOptions::default()).await;
                assert!(result.is_err());
            }

            #[tokio::test]
            async fn test_remove_first_and_multi() {
                let collection = seeded(5).await;
                let active = filter(json!({ "active": true }));

                assert_eq!(collection.remove(&active, RemoveOptions::default()).await.unwrap(), 1);
                assert_eq!(collection.remove(&active, RemoveOptions { multi: true }).await.unwrap(), 2);
                assert_eq!(collection.remove(&active, RemoveOptions { multi: true }).await.unwrap(), 0);
                assert_eq!(collection.count(&Filter::empty()).await.unwrap(), 2);
            }

            // ==================================================================
            // Edge Cases
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_inserts() {
                let collection = seeded(0).await;

                let handles: Vec<_> = (0..10)
                    .map(|i| {
                        let collection = collection.clone();
                        tokio::spawn(async move {
                            collection
                                .insert(person(&format!("concurrent_{}", i), i, true))
                                .await
                                .unwrap();
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.await.unwrap();
                }

                assert_eq!(collection.count(&Filter::empty()).await.unwrap(), 10);
            }
        }
    };
}
