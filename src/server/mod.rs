//! Server module for wiring validation into axum routers
//!
//! This module provides:
//! - `ValidationLayer`: tower middleware validating request bodies for one model type
//! - `ValidatedRoute`: extension trait attaching that layer to a route
//! - `ServerBuilder`: fluent assembly of validated routes, health checks and serving

pub mod builder;
pub mod layer;
pub mod route;

pub use builder::{BuildError, ServerBuilder};
pub use layer::{ValidationLayer, ValidationService};
pub use route::ValidatedRoute;
