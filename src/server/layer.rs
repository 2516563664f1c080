//! Tower middleware that validates request bodies before the handler runs
//!
//! For a model type `T`, each request goes through these steps:
//!
//! 1. No validator configured: the request is forwarded untouched.
//! 2. The body is buffered in memory (bounded by
//!    [`ValidationConfig::max_body_bytes`]).
//! 3. The body is parsed as JSON into `T`. If that fails the response is
//!    `400 {"error": "Couldn't map the model from the request body"}`.
//! 4. The validator runs. If it reports failures the response is
//!    `400 {"errors": {field: [messages]}}`.
//! 5. The request is rebuilt with a fresh view of the buffered body and
//!    handed to the inner service, exactly once.
//!
//! # Usage
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use routeguard::prelude::*;
//!
//! let app = Router::new().route(
//!     "/teams",
//!     post(create_team).route_layer(ValidationLayer::new(team_rules())),
//! );
//! ```

use crate::config::ValidationConfig;
use crate::core::body::BufferedBody;
use crate::core::error::ValidationRejection;
use crate::core::registry::ValidatorRegistry;
use crate::core::validator::Validator;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

// =============================================================================
// Validation Layer
// =============================================================================

/// Layer that wraps a service with request-body validation for model `T`
pub struct ValidationLayer<T> {
    validator: Option<Arc<dyn Validator<T>>>,
    config: ValidationConfig,
}

impl<T> ValidationLayer<T>
where
    T: Send + Sync + 'static,
{
    /// Validate every request with `validator`
    pub fn new(validator: impl Validator<T> + 'static) -> Self {
        let validator: Arc<dyn Validator<T>> = Arc::new(validator);
        Self::optional(Some(validator))
    }

    /// Validate with `validator` when present, otherwise pass requests through
    pub fn optional(validator: Option<Arc<dyn Validator<T>>>) -> Self {
        Self {
            validator,
            config: ValidationConfig::default(),
        }
    }

    /// Use whatever validator `registry` holds for `T`, if any
    pub fn from_registry(registry: &ValidatorRegistry) -> Self {
        let validator = registry.resolve::<T>();
        if validator.is_none() {
            tracing::debug!(
                model = std::any::type_name::<T>(),
                "No validator registered, requests will pass through"
            );
        }
        Self::optional(validator)
    }

    /// A layer that never validates
    pub fn disabled() -> Self {
        Self::optional(None)
    }

    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    /// Whether this layer will inspect request bodies at all
    pub fn is_enabled(&self) -> bool {
        self.validator.is_some()
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }
}

impl<T> Clone for ValidationLayer<T> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ValidationLayer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationLayer")
            .field("model", &std::any::type_name::<T>())
            .field("enabled", &self.validator.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl<S, T> Layer<S> for ValidationLayer<T> {
    type Service = ValidationService<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService {
            inner,
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}

// =============================================================================
// Validation Service
// =============================================================================

/// Service created by [`ValidationLayer`]
pub struct ValidationService<S, T> {
    inner: S,
    validator: Option<Arc<dyn Validator<T>>>,
    config: ValidationConfig,
}

impl<S: Clone, T> Clone for ValidationService<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            validator: self.validator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, T> Service<Request> for ValidationService<S, T>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The readied service is `self.inner`; keep it for this call and leave
        // a fresh clone behind for the next one.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let Some(validator) = self.validator.clone() else {
            return Box::pin(inner.call(request));
        };
        let config = self.config.clone();

        Box::pin(async move {
            let (parts, body) = request.into_parts();

            let parsed = match BufferedBody::read(body, config.max_body_bytes).await {
                Ok(buffered) => buffered.parse::<T>().map(|model| (buffered, model)),
                Err(failure) => Err(failure),
            };
            let (buffered, model) = match parsed {
                Ok(parsed) => parsed,
                Err(failure) => {
                    return Ok(reject::<T>(
                        ValidationRejection::UnmappableBody(failure),
                        &config,
                    ));
                }
            };

            let result = validator.validate(&model).await;
            drop(model);

            if !result.is_valid() {
                return Ok(reject::<T>(
                    ValidationRejection::Invalid(result.into_field_errors()),
                    &config,
                ));
            }

            inner
                .call(Request::from_parts(parts, buffered.into_body()))
                .await
        })
    }
}

fn reject<T>(rejection: ValidationRejection, config: &ValidationConfig) -> Response {
    if config.trace_rejections {
        tracing::debug!(
            model = std::any::type_name::<T>(),
            kind = rejection.kind(),
            reason = %rejection,
            "Request rejected by validation"
        );
    }
    rejection.into_response()
}
