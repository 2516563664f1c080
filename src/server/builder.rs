//! ServerBuilder for fluent API to build HTTP servers with validated routes

use super::layer::ValidationLayer;
use super::route::ValidatedRoute;
use crate::config::{ServerConfig, ValidationConfig};
use crate::core::registry::ValidatorRegistry;
use crate::core::validator::Validator;
use anyhow::Result;
use axum::routing::{MethodRouter, get};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashSet;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use validator::Validate;

type RouteFactory = Box<dyn FnOnce(&ValidatorRegistry, &ValidationConfig) -> MethodRouter + Send>;

struct PendingRoute {
    path: String,
    model: &'static str,
    build: RouteFactory,
}

/// Errors detected while assembling the router
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Two validated routes were declared for the same path
    #[error("validated route '{path}' is declared more than once")]
    DuplicateRoute { path: String },

    /// A validated route path does not start with '/'
    #[error("route path '{path}' must start with '/'")]
    InvalidPath { path: String },
}

/// Builder for creating HTTP servers whose routes validate their bodies
///
/// Validators can be registered before or after the routes that use them:
/// lookups happen in [`build`](Self::build).
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_validator::<CreateTeam>(team_rules())
///     .validated_route::<CreateTeam>("/teams", post(create_team))
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
    registry: ValidatorRegistry,
    routes: Vec<PendingRoute>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: ValidatorRegistry::new(),
            routes: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a YAML file
    pub fn with_config_file(self, path: &str) -> Result<Self> {
        let config = ServerConfig::from_yaml_file(path)?;
        Ok(self.with_config(config))
    }

    /// Use an existing registry, replacing validators registered so far
    pub fn with_registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register the validator for model `T`
    pub fn with_validator<T>(mut self, validator: impl Validator<T> + 'static) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.registry.register::<T>(validator);
        self
    }

    /// Register the `#[derive(Validate)]` rules of `T` as its validator
    pub fn with_derived_validator<T>(mut self) -> Self
    where
        T: Validate + Send + Sync + 'static,
    {
        self.registry.register_derived::<T>();
        self
    }

    /// Add a route whose request bodies are validated as `T`
    ///
    /// The route is added as-is when no validator is registered for `T` by
    /// the time [`build`](Self::build) runs.
    pub fn validated_route<T>(mut self, path: &str, route: MethodRouter) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.routes.push(PendingRoute {
            path: path.to_string(),
            model: std::any::type_name::<T>(),
            build: Box::new(move |registry, config| {
                route.with_validation(
                    ValidationLayer::<T>::from_registry(registry).with_config(config.clone()),
                )
            }),
        });
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for routes that take no validated body, such as listings,
    /// lookups, and webhooks.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the final router
    ///
    /// This generates:
    /// - Health routes (`/health`, `/healthz`)
    /// - Every validated route, wrapped with its validation layer
    /// - Custom routes
    /// - A request tracing layer over all of them
    pub fn build(self) -> Result<Router> {
        self.config.validate()?;

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(BuildError::InvalidPath {
                    path: route.path.clone(),
                }
                .into());
            }
            if !seen.insert(route.path.as_str()) {
                return Err(BuildError::DuplicateRoute {
                    path: route.path.clone(),
                }
                .into());
            }
        }

        let mut app = Self::health_routes();

        for route in self.routes {
            tracing::debug!(path = %route.path, model = route.model, "Registering validated route");
            let method_router = (route.build)(&self.registry, &self.config.validation);
            app = app.route(&route.path, method_router);
        }

        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown on the configured address
    ///
    /// This will:
    /// - Bind to `bind_address` from the configuration
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_address.clone();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/healthz", get(health_check))
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check endpoint handler
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
    }))
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
