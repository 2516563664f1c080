//! Registry of validators keyed by model type
//!
//! Route registration looks validators up here once, when the route is built.
//! A model type without a registered validator is simply not validated.

use crate::core::validator::{DeriveValidator, Validator};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

struct Entry {
    type_name: &'static str,
    // Holds an `Arc<dyn Validator<T>>` for the keyed `T`
    validator: Arc<dyn Any + Send + Sync>,
}

/// Validators for the model types of an application
///
/// Cloning is cheap: validators are shared behind `Arc`.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    entries: HashMap<TypeId, Arc<Entry>>,
}

impl ValidatorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register the validator for `T`
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register<T>(&mut self, validator: impl Validator<T> + 'static)
    where
        T: Send + Sync + 'static,
    {
        self.register_arc::<T>(Arc::new(validator));
    }

    /// Register an already shared validator for `T`
    pub fn register_arc<T>(&mut self, validator: Arc<dyn Validator<T>>)
    where
        T: Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let previous = self.entries.insert(
            TypeId::of::<T>(),
            Arc::new(Entry {
                type_name,
                validator: Arc::new(validator),
            }),
        );
        if previous.is_some() {
            tracing::debug!(model = type_name, "Replacing registered validator");
        }
    }

    /// Register the `#[derive(Validate)]` rules of `T` as its validator
    pub fn register_derived<T>(&mut self)
    where
        T: Validate + Send + Sync + 'static,
    {
        self.register::<T>(DeriveValidator::<T>::new());
    }

    /// Builder-style [`register`](Self::register)
    pub fn with<T>(mut self, validator: impl Validator<T> + 'static) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.register::<T>(validator);
        self
    }

    /// The validator registered for `T`, if any
    pub fn resolve<T>(&self) -> Option<Arc<dyn Validator<T>>>
    where
        T: Send + Sync + 'static,
    {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.validator.downcast_ref::<Arc<dyn Validator<T>>>())
            .cloned()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Type names of every model with a validator, sorted
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("models", &self.registered_types())
            .finish()
    }
}
