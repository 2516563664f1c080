//! Typed rejections for the validation middleware
//!
//! A request rejected by the middleware always ends up as one of the two
//! variants of [`ValidationRejection`], and both map to `400 Bad Request`:
//!
//! - [`ValidationRejection::UnmappableBody`]: the body could not be turned into
//!   a model instance. The wire payload is the fixed
//!   `{"error": "Couldn't map the model from the request body"}`.
//! - [`ValidationRejection::Invalid`]: the model was built but the validator
//!   reported failures. The wire payload is `{"errors": {field: [messages]}}`.
//!
//! # Example
//!
//! ```rust,ignore
//! use routeguard::prelude::*;
//!
//! let mut errors = FieldErrors::new();
//! errors.push("Name", "required");
//! let response = ValidationRejection::Invalid(errors).into_response();
//! assert_eq!(response.status(), StatusCode::BAD_REQUEST);
//! ```

use crate::core::body::MappingFailure;
use crate::core::validator::ValidationFailure;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde::Serialize;

/// Message returned when the request body cannot be mapped to the model
pub const UNMAPPABLE_BODY_MESSAGE: &str = "Couldn't map the model from the request body";

// =============================================================================
// Field Errors
// =============================================================================

/// Validation messages grouped by field name
///
/// Fields keep the order in which they were first reported, and messages keep
/// the order in which they were pushed. Serializes as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error map
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Append a message to a field, creating the field entry on first use
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages reported for a field
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Field names in first-seen order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over `(field, messages)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct fields with at least one message
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of messages across all fields
    pub fn message_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

impl FromIterator<ValidationFailure> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = ValidationFailure>>(iter: I) -> Self {
        let mut errors = Self::new();
        for failure in iter {
            errors.push(failure.field, failure.message);
        }
        errors
    }
}

// =============================================================================
// Rejections
// =============================================================================

/// Reasons the middleware short-circuits a request
#[derive(Debug, thiserror::Error)]
pub enum ValidationRejection {
    /// Body was empty, unreadable, not JSON, `null`, or the wrong shape
    #[error("Couldn't map the model from the request body: {0}")]
    UnmappableBody(#[source] MappingFailure),

    /// The model was parsed but failed validation
    #[error("validation failed for {} field(s)", .0.len())]
    Invalid(FieldErrors),
}

impl ValidationRejection {
    /// HTTP status for the rejection
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Short label used when logging the rejection
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationRejection::UnmappableBody(failure) => failure.kind(),
            ValidationRejection::Invalid(_) => "invalid",
        }
    }
}

#[derive(Serialize)]
struct UnmappableBodyPayload {
    error: &'static str,
}

#[derive(Serialize)]
struct InvalidModelPayload {
    errors: FieldErrors,
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Payloads are typed structs rather than `json!` values so the field
        // order of `FieldErrors` survives serialization.
        match self {
            ValidationRejection::UnmappableBody(_) => (
                status,
                Json(UnmappableBodyPayload {
                    error: UNMAPPABLE_BODY_MESSAGE,
                }),
            )
                .into_response(),
            ValidationRejection::Invalid(errors) => {
                (status, Json(InvalidModelPayload { errors })).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(field: &str, message: &str) -> ValidationFailure {
        ValidationFailure::new(field, message)
    }

    #[test]
    fn test_field_errors_group_by_field_in_first_seen_order() {
        let errors: FieldErrors = vec![
            failure("Name", "required"),
            failure("Age", "must be positive"),
            failure("Name", "too short"),
            failure("Age", "must be integer"),
        ]
        .into_iter()
        .collect();

        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["Name", "Age"]);
        assert_eq!(
            errors.get("Name").unwrap(),
            &["required".to_string(), "too short".to_string()]
        );
        assert_eq!(
            errors.get("Age").unwrap(),
            &["must be positive".to_string(), "must be integer".to_string()]
        );
        assert_eq!(errors.message_count(), 4);
    }

    #[test]
    fn test_field_errors_are_not_sorted() {
        let mut errors = FieldErrors::new();
        errors.push("zeta", "a");
        errors.push("alpha", "b");

        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(json, r#"{"zeta":["a"],"alpha":["b"]}"#);
    }

    #[test]
    fn test_empty_field_errors() {
        let errors = FieldErrors::new();
        assert!(errors.is_empty());
        assert_eq!(errors.len(), 0);
        assert!(errors.get("anything").is_none());
    }

    #[test]
    fn test_rejections_are_bad_request() {
        let unmappable = ValidationRejection::UnmappableBody(MappingFailure::Empty);
        let invalid = ValidationRejection::Invalid(FieldErrors::new());

        assert_eq!(unmappable.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            unmappable.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rejection_kind_labels() {
        assert_eq!(
            ValidationRejection::UnmappableBody(MappingFailure::Null).kind(),
            "null"
        );
        assert_eq!(
            ValidationRejection::Invalid(FieldErrors::new()).kind(),
            "invalid"
        );
    }

    #[test]
    fn test_unmappable_display_mentions_cause() {
        let err = ValidationRejection::UnmappableBody(MappingFailure::Empty);
        let msg = err.to_string();
        assert!(msg.starts_with(UNMAPPABLE_BODY_MESSAGE));
        assert!(msg.contains("empty"));
    }
}
