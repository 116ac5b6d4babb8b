//! A collection exposed as a REST resource

use super::pipeline::HookPipeline;
use super::router::build_resource_routes;
use crate::config::{ResourceConfig, ResourceOptions};
use crate::core::collection::Collection;
use axum::Router;
use serde_json::Value;
use std::sync::Arc;

/// A collection plus its effective configuration
///
/// The configuration is resolved once, here, and shared read-only by every
/// request afterwards.
///
/// # Example
///
/// ```rust,ignore
/// let people = RestResource::new(
///     InMemoryCollection::new(),
///     Some(ResourceOptions::new().with_methods([Method::Get]).with_limit(50)),
///     false,
/// );
/// let app = Router::new().nest("/people", people.router());
/// ```
#[derive(Debug, Clone)]
pub struct RestResource {
    pipeline: Arc<HookPipeline>,
}

impl RestResource {
    pub fn new(
        collection: impl Collection + 'static,
        options: Option<ResourceOptions>,
        debug: bool,
    ) -> Self {
        Self::with_collection(Arc::new(collection), options, debug)
    }

    /// Build from a collection that is already shared
    pub fn with_collection(
        collection: Arc<dyn Collection>,
        options: Option<ResourceOptions>,
        debug: bool,
    ) -> Self {
        Self::from_config(collection, ResourceConfig::resolve(options, debug))
    }

    /// Build from an untyped configuration value (malformed values yield the defaults)
    pub fn from_value(
        collection: impl Collection + 'static,
        options: Option<&Value>,
        debug: bool,
    ) -> Self {
        let config = ResourceConfig::resolve_value(options, debug);
        Self::from_config(Arc::new(collection), config)
    }

    fn from_config(collection: Arc<dyn Collection>, config: ResourceConfig) -> Self {
        tracing::debug!(
            methods = ?config.methods(),
            limit = ?config.limit(),
            debug = config.debug(),
            "resource configured"
        );
        Self {
            pipeline: Arc::new(HookPipeline::new(Arc::new(config), collection)),
        }
    }

    pub fn config(&self) -> &ResourceConfig {
        self.pipeline.config()
    }

    pub fn pipeline(&self) -> Arc<HookPipeline> {
        self.pipeline.clone()
    }

    /// The resource's routes, relative to its mount path
    pub fn router(&self) -> Router {
        build_resource_routes(self.pipeline.clone())
    }
}

/// Expose `collection` as a REST resource and return its router
///
/// Shorthand for `RestResource::new(collection, options, debug).router()`.
pub fn rest(
    collection: impl Collection + 'static,
    options: Option<ResourceOptions>,
    debug: bool,
) -> Router {
    RestResource::new(collection, options, debug).router()
}
