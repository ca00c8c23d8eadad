//! ServerBuilder for fluent API to build HTTP servers

use super::registry::{ResourceDescriptor, ResourceRegistry};
use super::resource::Resource;
use crate::config::ServerConfig;
use crate::core::{DataAccess, Entity};
use anyhow::{Result, anyhow};
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Builder for creating HTTP servers from registered resources
///
/// # Example
///
/// ```ignore
/// let config = ServerConfig::from_yaml_file("server.yaml")?;
///
/// ServerBuilder::new()
///     .with_config(config)
///     .register_configured("users", InMemoryStore::<String, User>::new())?
///     .serve()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
    registry: ResourceRegistry,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: ResourceRegistry::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Use the given configuration (bind address, service name, resources)
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register a resource route family
    pub fn register(mut self, descriptor: impl ResourceDescriptor + 'static) -> Self {
        self.registry.register(Box::new(descriptor));
        self
    }

    /// Register a resource under explicit paths
    ///
    /// ```ignore
    /// ServerBuilder::new()
    ///     .register_resource(users, "/users", "/users/{name}")
    /// ```
    pub fn register_resource<K, T>(
        self,
        resource: Resource<K, T>,
        collection_path: &str,
        item_path: &str,
    ) -> Self
    where
        K: PartialEq + Debug + Send + Sync + 'static,
        T: Entity<K>,
    {
        self.register(resource.mount(collection_path, item_path))
    }

    /// Register the resource named `name` in the configuration, backed by `store`
    ///
    /// The key is read from the configured path parameter.
    pub fn register_configured<K, T>(
        self,
        name: &str,
        store: impl DataAccess<K, T> + 'static,
    ) -> Result<Self>
    where
        K: FromStr + PartialEq + Debug + Send + Sync + 'static,
        K::Err: Display,
        T: Entity<K>,
    {
        let resource_config = self
            .config
            .resource(name)
            .cloned()
            .ok_or_else(|| anyhow!("Resource '{}' is not configured", name))?;

        let resource = Resource::from_config(&resource_config, store);
        let item_path = resource_config.item_path();

        Ok(self.register_resource(resource, &resource_config.collection_path, &item_path))
    }

    /// Add custom routes to the server
    ///
    /// Use this to add routes that don't fit the CRUD pattern.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the final router
    ///
    /// This generates:
    /// - Health check routes
    /// - CRUD routes for all registered resources
    /// - Custom routes
    ///
    /// wrapped in a request tracing layer.
    pub fn build(self) -> Result<Router> {
        for configured in &self.config.resources {
            if !self.registry.names().contains(&configured.name.as_str()) {
                tracing::warn!(resource = %configured.name, "configured resource has no store registered");
            }
        }

        let mut app = health_routes(&self.config.service_name).merge(self.registry.build_routes());

        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application on the configured address with graceful shutdown
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_addr.clone();
        self.serve_on(&addr).await
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve_on(self, addr: &str) -> Result<()> {
        let resources = self.registry.len();
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(resources, "Server listening on {}", addr);

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
fn health_routes(service_name: &str) -> Router {
    let body = json!({
        "status": "ok",
        "service": service_name,
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .with_state(body)
}

/// Health check endpoint handler
async fn health_check(axum::extract::State(body): axum::extract::State<Value>) -> Json<Value> {
    Json(body)
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
