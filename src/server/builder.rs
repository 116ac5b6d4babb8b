//! ServerBuilder for fluent API to build HTTP servers

use super::resource::RestResource;
use super::resource_registry::ResourceRegistry;
use anyhow::Result;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

const DEFAULT_SERVICE_NAME: &str = "collection-rest";

/// Builder for an HTTP server exposing registered resources
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .register("/people", RestResource::new(InMemoryCollection::new(), None, false))
///     .serve("127.0.0.1:3000")
///     .await?;
/// ```
pub struct ServerBuilder {
    registry: ResourceRegistry,
    custom_routes: Vec<Router>,
    service_name: String,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            registry: ResourceRegistry::new(),
            custom_routes: Vec::new(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }

    /// Mount a resource at `path`
    pub fn register(mut self, path: &str, resource: RestResource) -> Self {
        self.registry.register(path, resource);
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for endpoints that are not collection resources, such as
    /// authentication or webhooks.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Name reported by the health routes
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Build the final router
    ///
    /// This generates:
    /// - Health check routes (`/health`, `/healthz`)
    /// - The routes of every registered resource
    /// - Custom routes
    ///
    /// and wraps them in an HTTP tracing layer.
    pub fn build(self) -> Result<Router> {
        if self.registry.is_empty() && self.custom_routes.is_empty() {
            return Err(anyhow::anyhow!(
                "No resources registered. Call .register() at least once"
            ));
        }

        let mut app = health_routes(self.service_name).merge(self.registry.build_routes());
        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build health check routes
fn health_routes(service: String) -> Router {
    let health = get(move || health_check(service.clone()));
    Router::new()
        .route("/health", health.clone())
        .route("/healthz", health)
}

/// Health check endpoint handler
async fn health_check(service: String) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": service
    }))
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
