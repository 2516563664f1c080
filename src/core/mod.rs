//! Core module containing the validation contract and its building blocks

pub mod body;
pub mod error;
pub mod registry;
pub mod rules;
pub mod validator;

pub use body::{BufferedBody, MappingFailure};
pub use error::{FieldErrors, UNMAPPABLE_BODY_MESSAGE, ValidationRejection};
pub use registry::ValidatorRegistry;
pub use rules::RuleSet;
pub use validator::{
    DeriveValidator, FnValidator, ValidationFailure, ValidationResult, Validator, validator_fn,
};
