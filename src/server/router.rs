//! Route registration for one resource

use super::pipeline::HookPipeline;
use crate::config::Method;
use crate::core::request::RawRequest;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::MethodRouter;
use std::collections::HashMap;
use std::sync::Arc;

/// Build the routes of a resource
///
/// Only the verbs enabled in the pipeline's configuration get a handler:
/// - GET / - find, or count when requested
/// - POST / - insert
/// - PUT / - update
/// - DELETE / - remove
///
/// Any other verb is answered by axum with `405 Method Not Allowed`.
pub fn build_resource_routes(pipeline: Arc<HookPipeline>) -> Router {
    let mut route: MethodRouter<Arc<HookPipeline>> = MethodRouter::new();

    for method in pipeline.config().methods() {
        route = match method {
            Method::Get => route.get(get_documents),
            Method::Post => route.post(insert_document),
            Method::Put => route.put(update_documents),
            Method::Delete => route.delete(remove_documents),
        };
    }

    Router::new().route("/", route).with_state(pipeline)
}

fn raw_request(headers: HeaderMap, query: HashMap<String, String>, body: Bytes) -> RawRequest {
    RawRequest {
        headers,
        query,
        body,
    }
}

async fn get_documents(
    State(pipeline): State<Arc<HookPipeline>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    pipeline
        .handle(Method::Get, raw_request(headers, query, body))
        .await
}

async fn insert_document(
    State(pipeline): State<Arc<HookPipeline>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    pipeline
        .handle(Method::Post, raw_request(headers, query, body))
        .await
}

async fn update_documents(
    State(pipeline): State<Arc<HookPipeline>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    pipeline
        .handle(Method::Put, raw_request(headers, query, body))
        .await
}

async fn remove_documents(
    State(pipeline): State<Arc<HookPipeline>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    pipeline
        .handle(Method::Delete, raw_request(headers, query, body))
        .await
}
