//! Registry of resources and their mount paths

use super::resource::RestResource;
use axum::Router;
use indexmap::IndexMap;

/// Registry for all resources in the application
///
/// Resources are kept in registration order; registering a second resource
/// on the same path replaces the first.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: IndexMap<String, RestResource>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `resource` at `path` (`"people"`, `"/people"` and `"/people/"` are equivalent)
    pub fn register(&mut self, path: &str, resource: RestResource) {
        let path = normalize_path(path);
        tracing::debug!(%path, methods = ?resource.config().methods(), "resource registered");
        self.resources.insert(path, resource);
    }

    pub fn get(&self, path: &str) -> Option<&RestResource> {
        self.resources.get(&normalize_path(path))
    }

    /// Mount paths in registration order
    pub fn paths(&self) -> Vec<&str> {
        self.resources.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Build a router with every resource nested under its path
    pub fn build_routes(&self) -> Router {
        let mut router = Router::new();

        for (path, resource) in &self.resources {
            router = if path == "/" {
                router.merge(resource.router())
            } else {
                router.nest(path, resource.router())
            };
        }

        router
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryCollection;

    fn resource() -> RestResource {
        RestResource::new(InMemoryCollection::new(), None, false)
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ResourceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.paths().is_empty());
    }

    #[test]
    fn test_paths_are_normalized() {
        let mut registry = ResourceRegistry::new();
        registry.register("people/", resource());
        registry.register("", resource());

        assert_eq!(registry.paths(), vec!["/people", "/"]);
        assert!(registry.get("/people").is_some());
        assert!(registry.get("people").is_some());
    }

    #[test]
    fn test_register_duplicate_replaces() {
        let mut registry = ResourceRegistry::new();
        registry.register("/people", resource());
        registry.register("/people", resource());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_build_routes_with_resources() {
        let mut registry = ResourceRegistry::new();
        registry.register("/people", resource());
        registry.register("/orders", resource());
        let _router = registry.build_routes();
    }
}
