//! REST integration test macro for storage backends.
//!
//! The `rest_integration_tests!` macro generates HTTP-level tests that drive a
//! `Collection` through full round-trips:
//! encoded payload → HTTP request → pipeline → Collection → `{ data }` response.

/// Generate a REST integration test suite for a storage backend.
///
/// `$factory` must produce an empty `impl Collection + Clone + 'static`.
///
/// # Generated Tests
///
/// ## Operations
/// - `test_rest_find_all`: GET with an empty filter returns every document
/// - `test_rest_count`: GET with `count` returns an integer, repeatably
/// - `test_rest_insert`: POST returns the document with its generated id
/// - `test_rest_update_multi`: PUT with `multi` updates every match
/// - `test_rest_remove_single`: DELETE without `multi` removes at most one
///
/// ## Query resolution
/// - `test_rest_limit_ceiling`: server limit caps the client limit
/// - `test_rest_pattern_query`: `$regex` in the query string
/// - `test_rest_projection_override`: server projection wins on shared keys
/// - `test_rest_locked_field_with_client_inclusion`: a server exclusion
///   combines with a client inclusion projection
#[macro_export]
macro_rules! rest_integration_tests {
    ($factory:expr) => {
        mod rest_integration_tests {
            use super::*;
            use axum_test::TestServer;
            use collection_rest::config::ResourceOptions;
            use collection_rest::core::{Collection, Projection};
            use serde_json::{Value, json};

            async fn make_server(
                collection: impl Collection + 'static,
                options: Option<ResourceOptions>,
            ) -> TestServer {
                let router = collection_rest::rest(collection, options, false);
                TestServer::try_new(router).unwrap()
            }

            async fn seeded(n: usize) -> impl Collection + Clone + 'static {
                let collection = $factory;
                for doc in sample_batch(n) {
                    collection.insert(doc).await.unwrap();
                }
                collection
            }

            fn data_len(body: &Value) -> usize {
                body["data"].as_array().map_or(0, Vec::len)
            }

            // ==============================================================
            // Operations
            // ==============================================================

            #[tokio::test]
            async fn test_rest_find_all() {
                let server = make_server(seeded(3).await, None).await;

                let response = server.get("/").add_query_param("json", "{}").await;

                response.assert_status_ok();
                let body: Value = response.json();
                assert_eq!(data_len(&body), 3);
            }

            #[tokio::test]
            async fn test_rest_count() {
                let server = make_server(seeded(4).await, None).await;
                let payload = json!({ "query": { "active": true }, "count": true }).to_string();

                let first: Value = server.get("/").add_query_param("json", &payload).await.json();
                let second: Value = server.get("/").add_query_param("json", &payload).await.json();

                assert_eq!(first, json!({ "data": 2 }));
                assert_eq!(first, second);
            }

            #[tokio::test]
            async fn test_rest_insert() {
                let collection = $factory;
                let server = make_server(collection.clone(), None).await;

                let response = server
                    .post("/")
                    .json(&json!({ "json": json!({ "query": { "name": "x" } }).to_string() }))
                    .await;

                response.assert_status_ok();
                let body: Value = response.json();
                assert_eq!(body["data"]["name"], "x");
                assert!(body["data"].get("_id").is_some());

                let stored = collection
                    .count(&filter(json!({ "name": "x" })))
                    .await
                    .unwrap();
                assert_eq!(stored, 1);
            }

            #[tokio::test]
            async fn test_rest_update_multi() {
                let collection = seeded(4).await;
                let server = make_server(collection.clone(), None).await;

                let response = server
                    .put("/")
                    .json(&json!({ "json": {
                        "query": { "active": true },
                        "update": { "$set": { "age": 2 } },
                        "multi": true
                    }}))
                    .await;

                response.assert_status_ok();
                response.assert_json(&json!({ "data": { "count": 2 } }));
                assert_eq!(collection.count(&filter(json!({ "age": 2 }))).await.unwrap(), 2);
            }

            #[tokio::test]
            async fn test_rest_remove_single() {
                let collection = $factory;
                for _ in 0..2 {
                    collection.insert(person("x", 1, true)).await.unwrap();
                }
                let server = make_server(collection.clone(), None).await;

                let response = server
                    .delete("/")
                    .json(&json!({ "json": json!({ "query": { "name": "x" } }).to_string() }))
                    .await;

                response.assert_status_ok();
                response.assert_json(&json!({ "data": 1 }));
                assert_eq!(collection.count(&filter(json!({ "name": "x" }))).await.unwrap(), 1);
            }

            // ==============================================================
            // Query resolution
            // ==============================================================

            #[tokio::test]
            async fn test_rest_limit_ceiling() {
                let options = ResourceOptions::new().with_limit(10);
                let server = make_server(seeded(15).await, Some(options)).await;

                let body: Value = server
                    .get("/")
                    .add_query_param("json", r#"{"limit": 20}"#)
                    .await
                    .json();
                assert_eq!(data_len(&body), 10);

                let body: Value = server
                    .get("/")
                    .add_query_param("json", r#"{"limit": 5}"#)
                    .await
                    .json();
                assert_eq!(data_len(&body), 5);

                let body: Value = server.get("/").await.json();
                assert_eq!(data_len(&body), 10);
            }

            #[tokio::test]
            async fn test_rest_pattern_query() {
                let collection = $factory;
                for name in ["alice", "amy", "bob"] {
                    collection.insert(person(name, 30, true)).await.unwrap();
                }
                let server = make_server(collection, None).await;

                let payload = json!({
                    "query": { "name": { "$regex": "^a" } },
                    "sort": { "name": 1 }
                });
                let body: Value = server
                    .get("/")
                    .add_query_param("json", payload.to_string())
                    .await
                    .json();

                let names: Vec<&str> = body["data"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .filter_map(|d| d["name"].as_str())
                    .collect();
                assert_eq!(names, vec!["alice", "amy"]);
            }

            #[tokio::test]
            async fn test_rest_projection_override() {
                let options = ResourceOptions::new()
                    .with_projection(Projection::new().with("age", false));
                let server = make_server(seeded(1).await, Some(options)).await;

                // The client asks for age; the server's exclusion wins
                let body: Value = server
                    .get("/")
                    .add_query_param("json", r#"{"projection": {"age": 1, "_id": 0}}"#)
                    .await
                    .json();
                assert_eq!(body, json!({ "data": [ { "name": "person_0", "active": true } ] }));
            }

            #[tokio::test]
            async fn test_rest_locked_field_with_client_inclusion() {
                let options = ResourceOptions::new()
                    .with_projection(Projection::new().with("age", false));
                let server = make_server(seeded(1).await, Some(options)).await;

                let response = server
                    .get("/")
                    .add_query_param("json", r#"{"projection": {"name": 1, "age": 1, "_id": 0}}"#)
                    .await;

                response.assert_status_ok();
                response.assert_json(&json!({ "data": [ { "name": "person_0" } ] }));
            }
        }
    };
}
