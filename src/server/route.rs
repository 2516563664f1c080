//! Attaching validation to individual routes

use super::layer::ValidationLayer;
use crate::config::ValidationConfig;
use crate::core::registry::ValidatorRegistry;
use axum::routing::MethodRouter;
use serde::de::DeserializeOwned;

/// Extension methods for attaching body validation to an axum route
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::post};
/// use routeguard::prelude::*;
///
/// let app = Router::new()
///     .route("/teams", post(create_team).with_validator::<CreateTeam>(&registry))
///     .route("/seasons", post(create_season).with_validator::<CreateSeason>(&registry));
/// ```
pub trait ValidatedRoute: Sized {
    /// Validate request bodies as `T` using the validator registered for `T`
    ///
    /// The lookup happens once, here. If nothing is registered for `T` the
    /// route behaves as if validation was never attached.
    fn with_validator<T>(self, registry: &ValidatorRegistry) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.with_validator_config::<T>(registry, ValidationConfig::default())
    }

    /// Same as [`with_validator`](Self::with_validator) with explicit settings
    fn with_validator_config<T>(self, registry: &ValidatorRegistry, config: ValidationConfig) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.with_validation(ValidationLayer::<T>::from_registry(registry).with_config(config))
    }

    /// Attach an explicitly built layer
    fn with_validation<T>(self, layer: ValidationLayer<T>) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static;
}

impl<S> ValidatedRoute for MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_validation<T>(self, layer: ValidationLayer<T>) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.route_layer(layer)
    }
}
