//! # routeguard
//!
//! Request-body validation middleware for axum routes.
//!
//! ## Features
//!
//! - **Typed Validators**: async `Validator<T>` trait, derive support through the `validator` crate
//! - **Rule Sets**: ordered, declarative field rules with sync and async checks
//! - **Registry**: validators keyed by model type, resolved when routes are built
//! - **Tower Middleware**: `ValidationLayer<T>` short-circuits bad requests with a `400`
//! - **Intact Bodies**: handlers receive the original body bytes after validation
//! - **Server Builder**: health routes, request tracing and graceful shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use routeguard::prelude::*;
//!
//! #[derive(Clone, Deserialize)]
//! struct CreateTeam {
//!     name: String,
//!     founded: i32,
//! }
//!
//! let rules = RuleSet::<CreateTeam>::new()
//!     .rule("Name", |t| t.name.as_str(), rules::not_empty::<str>())
//!     .rule("Founded", |t| &t.founded, rules::min_value(1850));
//!
//! ServerBuilder::new()
//!     .with_validator::<CreateTeam>(rules)
//!     .validated_route::<CreateTeam>("/teams", post(create_team))
//!     .serve()
//!     .await?;
//! ```
//!
//! A rejected request gets one of two bodies, both with status `400`:
//!
//! ```text
//! {"error":"Couldn't map the model from the request body"}
//! {"errors":{"Name":["'Name' must not be empty."]}}
//! ```

pub mod config;
pub mod core;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        BufferedBody, DeriveValidator, FieldErrors, MappingFailure, RuleSet,
        UNMAPPABLE_BODY_MESSAGE, ValidationFailure, ValidationRejection, ValidationResult,
        Validator, ValidatorRegistry, rules, validator_fn,
    };

    // === Config ===
    pub use crate::config::{ServerConfig, ValidationConfig};

    // === Server ===
    pub use crate::server::{
        BuildError, ServerBuilder, ValidatedRoute, ValidationLayer, ValidationService,
    };

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::{delete, get, post, put},
    };
}
