//! Validator contract used by the middleware
//!
//! A [`Validator<T>`] inspects a model instance and reports zero or more
//! field-level failures in a [`ValidationResult`]. Validation is async so that
//! rules can consult a store (uniqueness checks and the like).
//!
//! Three ways to get a validator:
//!
//! - implement [`Validator<T>`] directly
//! - derive [`validator::Validate`] on the model and use [`DeriveValidator`]
//! - build a [`RuleSet`](crate::core::rules::RuleSet) or wrap a closure with [`validator_fn`]

use crate::core::error::FieldErrors;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

// =============================================================================
// Result Types
// =============================================================================

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a validator run
///
/// Failures are kept in the order they were reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    /// A result with no failures
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    /// Record a failure
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.failures.push(ValidationFailure::new(field, message));
    }

    /// Append all failures of `other` after the current ones
    pub fn merge(&mut self, other: ValidationResult) {
        self.failures.extend(other.failures);
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Group failures by field, preserving first-seen field order
    pub fn into_field_errors(self) -> FieldErrors {
        self.failures.into_iter().collect()
    }
}

// =============================================================================
// Validator Trait
// =============================================================================

/// Validates model instances of type `T`
#[async_trait]
pub trait Validator<T>: Send + Sync {
    /// Run every rule against `model` and report what failed
    async fn validate(&self, model: &T) -> ValidationResult;
}

// =============================================================================
// Derive Adapter
// =============================================================================

/// Validator backed by a `#[derive(Validate)]` implementation
///
/// Nested errors are flattened into paths such as `address.city` and
/// `players[0].name`. The validator library reports fields in hash order, so
/// paths are emitted sorted; messages within a field keep the library's
/// order. A rule without a message reports its code.
///
/// ```rust,ignore
/// #[derive(Deserialize, Validate)]
/// struct CreateSeason {
///     #[validate(range(min = 1850, message = "must be after 1850"))]
///     year: i32,
/// }
///
/// registry.register(DeriveValidator::<CreateSeason>::new());
/// ```
pub struct DeriveValidator<T>(PhantomData<fn(&T)>);

impl<T> DeriveValidator<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for DeriveValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DeriveValidator<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Validator<T> for DeriveValidator<T>
where
    T: Validate + Send + Sync,
{
    async fn validate(&self, model: &T) -> ValidationResult {
        match model.validate() {
            Ok(()) => ValidationResult::valid(),
            Err(errors) => {
                let mut result = ValidationResult::valid();
                flatten_errors(&errors, None, &mut result);
                result
            }
        }
    }
}

fn join_path(prefix: Option<&str>, field: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}.{}", prefix, field),
        None => field.to_string(),
    }
}

fn flatten_errors(errors: &ValidationErrors, prefix: Option<&str>, out: &mut ValidationResult) {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in entries {
        let path = join_path(prefix, field);
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    out.push(path.clone(), message);
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                flatten_errors(nested, Some(&path), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let item_path = format!("{}[{}]", path, index);
                    flatten_errors(nested, Some(&item_path), out);
                }
            }
        }
    }
}

// =============================================================================
// Closure Adapter
// =============================================================================

/// Validator built from an async closure, see [`validator_fn`]
pub struct FnValidator<F> {
    check: F,
}

/// Wrap a closure returning a future of [`ValidationResult`] as a validator
///
/// The closure receives a clone of the model so the returned future can be
/// `'static`.
///
/// ```rust,ignore
/// let v = validator_fn(|team: Team| async move {
///     let mut result = ValidationResult::valid();
///     if team.name.is_empty() {
///         result.push("Name", "required");
///     }
///     result
/// });
/// ```
pub fn validator_fn<F>(check: F) -> FnValidator<F> {
    FnValidator { check }
}

#[async_trait]
impl<T, F, Fut> Validator<T> for FnValidator<F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = ValidationResult> + Send + 'static,
{
    async fn validate(&self, model: &T) -> ValidationResult {
        (self.check)(model.clone()).await
    }
}
