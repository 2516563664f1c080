//! Declarative rule sets
//!
//! A [`RuleSet<T>`] is an ordered list of field checks that implements
//! [`Validator<T>`]. Each rule projects a value out of the model and hands it
//! to a check closure of the form `Fn(&str, &V) -> Result<(), String>`, where
//! the first argument is the field name used in messages.
//!
//! Rules run in declaration order and all of them run; a field can collect
//! several messages.
//!
//! ```rust,ignore
//! let rules = RuleSet::<CreateTeam>::new()
//!     .rule("Name", |t| &t.name, rules::not_empty())
//!     .rule("Name", |t| &t.name, rules::length(2, 64))
//!     .rule("Founded", |t| &t.founded, rules::min_value(1850))
//!     .rule_async("Name", |t| t.name.clone(), move |_, name| {
//!         let store = store.clone();
//!         async move {
//!             if store.team_exists(&name).await {
//!                 Err("must be unique".to_string())
//!             } else {
//!                 Ok(())
//!             }
//!         }
//!     });
//! ```

use crate::core::validator::{ValidationResult, Validator};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use validator::ValidateEmail;

type SyncCheck<T> = Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>;
type AsyncCheck<T> = Box<dyn Fn(&T) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

enum Check<T> {
    Sync(SyncCheck<T>),
    Async(AsyncCheck<T>),
}

struct Rule<T> {
    field: Arc<str>,
    check: Check<T>,
}

/// Ordered collection of field rules for a model type
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleSet<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a synchronous rule over a borrowed projection of the model
    pub fn rule<V, P, C>(mut self, field: impl Into<String>, project: P, check: C) -> Self
    where
        V: ?Sized,
        P: Fn(&T) -> &V + Send + Sync + 'static,
        C: Fn(&str, &V) -> Result<(), String> + Send + Sync + 'static,
    {
        let field: Arc<str> = field.into().into();
        let name = field.clone();
        self.rules.push(Rule {
            field,
            check: Check::Sync(Box::new(move |model: &T| check(&*name, project(model)))),
        });
        self
    }

    /// Add an asynchronous rule over an owned projection of the model
    ///
    /// The projection is taken before the check runs, so the check future
    /// does not borrow the model.
    pub fn rule_async<V, P, C, Fut>(mut self, field: impl Into<String>, project: P, check: C) -> Self
    where
        V: Send + 'static,
        P: Fn(&T) -> V + Send + Sync + 'static,
        C: Fn(&str, V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let field: Arc<str> = field.into().into();
        let name = field.clone();
        self.rules.push(Rule {
            field,
            check: Check::Async(Box::new(move |model: &T| {
                check(&*name, project(model)).boxed()
            })),
        });
        self
    }

    /// Number of rules in the set
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T> Default for RuleSet<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Validator<T> for RuleSet<T>
where
    T: Send + Sync + 'static,
{
    async fn validate(&self, model: &T) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for rule in &self.rules {
            let outcome = match &rule.check {
                Check::Sync(check) => check(model),
                Check::Async(check) => check(model).await,
            };
            if let Err(message) = outcome {
                result.push(&*rule.field, message);
            }
        }

        result
    }
}

// =============================================================================
// Rule Constructors
// =============================================================================

/// Rule: optional value must be present
pub fn required<V>() -> impl Fn(&str, &Option<V>) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Option<V>| {
        if value.is_none() {
            Err(format!("'{}' is required.", field))
        } else {
            Ok(())
        }
    }
}

/// Rule: string must contain something other than whitespace
pub fn not_empty<V>() -> impl Fn(&str, &V) -> Result<(), String> + Send + Sync + Clone
where
    V: AsRef<str> + ?Sized,
{
    |field: &str, value: &V| {
        if value.as_ref().trim().is_empty() {
            Err(format!("'{}' must not be empty.", field))
        } else {
            Ok(())
        }
    }
}

/// Rule: string length (in characters) must be within `min..=max`
pub fn length<V>(
    min: usize,
    max: usize,
) -> impl Fn(&str, &V) -> Result<(), String> + Send + Sync + Clone
where
    V: AsRef<str> + ?Sized,
{
    move |field: &str, value: &V| {
        let len = value.as_ref().chars().count();
        if len < min || len > max {
            Err(format!(
                "'{}' must be between {} and {} characters. You entered {} characters.",
                field, min, max, len
            ))
        } else {
            Ok(())
        }
    }
}

/// Rule: number must be greater than zero
pub fn positive<N>() -> impl Fn(&str, &N) -> Result<(), String> + Send + Sync + Clone
where
    N: PartialOrd + Default,
{
    |field: &str, value: &N| {
        if *value > N::default() {
            Ok(())
        } else {
            Err(format!("'{}' must be greater than 0.", field))
        }
    }
}

/// Rule: value must be at least `min`
pub fn min_value<N>(min: N) -> impl Fn(&str, &N) -> Result<(), String> + Send + Sync + Clone
where
    N: PartialOrd + Display + Clone + Send + Sync,
{
    move |field: &str, value: &N| {
        if *value < min {
            Err(format!(
                "'{}' must be greater than or equal to '{}'.",
                field, min
            ))
        } else {
            Ok(())
        }
    }
}

/// Rule: value must not exceed `max`
pub fn max_value<N>(max: N) -> impl Fn(&str, &N) -> Result<(), String> + Send + Sync + Clone
where
    N: PartialOrd + Display + Clone + Send + Sync,
{
    move |field: &str, value: &N| {
        if *value > max {
            Err(format!("'{}' must be less than or equal to '{}'.", field, max))
        } else {
            Ok(())
        }
    }
}

/// Rule: string must be one of the allowed values
pub fn one_of<V>(allowed: Vec<String>) -> impl Fn(&str, &V) -> Result<(), String> + Send + Sync + Clone
where
    V: AsRef<str> + ?Sized,
{
    move |field: &str, value: &V| {
        let value = value.as_ref();
        if allowed.iter().any(|a| a == value) {
            Ok(())
        } else {
            Err(format!(
                "'{}' must be one of: {}.",
                field,
                allowed.join(", ")
            ))
        }
    }
}

/// Rule: string must match `pattern`
pub fn matches<V>(pattern: Regex) -> impl Fn(&str, &V) -> Result<(), String> + Send + Sync + Clone
where
    V: AsRef<str> + ?Sized,
{
    move |field: &str, value: &V| {
        if pattern.is_match(value.as_ref()) {
            Ok(())
        } else {
            Err(format!("'{}' is not in the correct format.", field))
        }
    }
}

/// Rule: string must be an email address
pub fn email<V>() -> impl Fn(&str, &V) -> Result<(), String> + Send + Sync + Clone
where
    V: AsRef<str> + ?Sized,
{
    |field: &str, value: &V| {
        if value.as_ref().validate_email() {
            Ok(())
        } else {
            Err(format!("'{}' is not a valid email address.", field))
        }
    }
}

/// Rule: string must parse as a date in `format` (chrono syntax)
pub fn date_format<V>(
    format: &'static str,
) -> impl Fn(&str, &V) -> Result<(), String> + Send + Sync + Clone
where
    V: AsRef<str> + ?Sized,
{
    move |field: &str, value: &V| match chrono::NaiveDate::parse_from_str(value.as_ref(), format) {
        Ok(_) => Ok(()),
        Err(_) => Err(format!("'{}' must be a date in the format {}.", field, format)),
    }
}

/// Replace the message of any rule with a fixed one
pub fn with_message<V, C>(
    check: C,
    message: impl Into<String>,
) -> impl Fn(&str, &V) -> Result<(), String> + Send + Sync + Clone
where
    V: ?Sized,
    C: Fn(&str, &V) -> Result<(), String> + Send + Sync + Clone,
{
    let message = message.into();
    move |field: &str, value: &V| check(field, value).map_err(|_| message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct Team {
        name: String,
        founded: i32,
        city: Option<String>,
    }

    fn team(name: &str, founded: i32) -> Team {
        Team {
            name: name.to_string(),
            founded,
            city: Some("Amsterdam".to_string()),
        }
    }

    // === required() ===

    #[test]
    fn test_required_none_returns_error() {
        let v = required::<String>();
        let result = v("City", &None);
        assert_eq!(result.unwrap_err(), "'City' is required.");
    }

    #[test]
    fn test_required_some_returns_ok() {
        let v = required();
        assert!(v("City", &Some("Leiden".to_string())).is_ok());
    }

    // === not_empty() ===

    #[test]
    fn test_not_empty_blank_returns_error() {
        let v = not_empty::<str>();
        assert!(v("Name", "").is_err());
        assert!(v("Name", "   ").is_err());
        assert!(v("Name", "Ajax").is_ok());
    }

    // === length() ===

    #[test]
    fn test_length_bounds_are_inclusive() {
        let v = length::<str>(2, 4);
        assert!(v("Name", "a").is_err());
        assert!(v("Name", "ab").is_ok());
        assert!(v("Name", "abcd").is_ok());
        assert!(v("Name", "abcde").is_err());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let v = length::<str>(1, 3);
        assert!(v("Name", "éèê").is_ok());
    }

    #[test]
    fn test_length_message_reports_actual_length() {
        let v = length::<str>(3, 10);
        let message = v("Name", "ab").unwrap_err();
        assert!(message.contains("between 3 and 10"));
        assert!(message.contains("You entered 2"));
    }

    // === positive() / min_value() / max_value() ===

    #[test]
    fn test_positive() {
        let v = positive::<i32>();
        assert!(v("Age", &1).is_ok());
        assert!(v("Age", &0).is_err());
        assert!(v("Age", &-3).is_err());
    }

    #[test]
    fn test_positive_float() {
        let v = positive::<f64>();
        assert!(v("Price", &0.5).is_ok());
        assert!(v("Price", &-0.5).is_err());
    }

    #[test]
    fn test_min_and_max_value_are_inclusive() {
        let min = min_value(1850);
        let max = max_value(2100);
        assert!(min("Founded", &1850).is_ok());
        assert!(min("Founded", &1849).is_err());
        assert!(max("Founded", &2100).is_ok());
        assert!(max("Founded", &2101).is_err());
    }

    // === one_of() ===

    #[test]
    fn test_one_of() {
        let v = one_of::<str>(vec!["league".into(), "cup".into()]);
        assert!(v("Competition", "cup").is_ok());
        let message = v("Competition", "friendly").unwrap_err();
        assert!(message.contains("league, cup"));
    }

    #[test]
    fn test_one_of_empty_list_rejects_everything() {
        let v = one_of::<str>(vec![]);
        assert!(v("Competition", "cup").is_err());
    }

    // === matches() / email() / date_format() ===

    #[test]
    fn test_matches_regex() {
        let v = matches::<str>(Regex::new(r"^[A-Z]{3}$").unwrap());
        assert!(v("Code", "AJA").is_ok());
        assert!(v("Code", "aja").is_err());
    }

    #[test]
    fn test_email() {
        let v = email::<str>();
        assert!(v("Contact", "press@ajax.nl").is_ok());
        assert!(v("Contact", "not-an-email").is_err());
    }

    #[test]
    fn test_date_format() {
        let v = date_format::<str>("%Y-%m-%d");
        assert!(v("Date", "2024-05-12").is_ok());
        assert!(v("Date", "12/05/2024").is_err());
        assert!(v("Date", "2024-02-30").is_err());
    }

    // === with_message() ===

    #[test]
    fn test_with_message_overrides_message() {
        let v = with_message(not_empty::<str>(), "required");
        assert_eq!(v("Name", "").unwrap_err(), "required");
        assert!(v("Name", "Ajax").is_ok());
    }

    // === RuleSet ===

    #[tokio::test]
    async fn test_rule_set_passes_valid_model() {
        let rules = RuleSet::<Team>::new()
            .rule("Name", |t: &Team| t.name.as_str(), not_empty::<str>())
            .rule("Founded", |t: &Team| &t.founded, positive::<i32>());

        assert_eq!(rules.len(), 2);
        assert!(rules.validate(&team("Ajax", 1900)).await.is_valid());
    }

    #[tokio::test]
    async fn test_rule_set_runs_every_rule_in_order() {
        let rules = RuleSet::<Team>::new()
            .rule("Name", |t: &Team| t.name.as_str(), with_message(not_empty::<str>(), "required"))
            .rule("Founded", |t: &Team| &t.founded, with_message(positive::<i32>(), "must be positive"))
            .rule("Name", |t: &Team| t.name.as_str(), with_message(length::<str>(2, 10), "too short"))
            .rule("City", |t: &Team| &t.city, required::<String>());

        let mut model = team("", -1);
        model.city = None;
        let result = rules.validate(&model).await;

        let failures: Vec<(&str, &str)> = result
            .failures()
            .iter()
            .map(|f| (f.field.as_str(), f.message.as_str()))
            .collect();
        assert_eq!(
            failures,
            vec![
                ("Name", "required"),
                ("Founded", "must be positive"),
                ("Name", "too short"),
                ("City", "'City' is required."),
            ]
        );

        let errors = result.into_field_errors();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["Name", "Founded", "City"]);
    }

    #[tokio::test]
    async fn test_rule_set_async_rule() {
        let taken = vec!["Ajax".to_string()];
        let rules = RuleSet::<Team>::new().rule_async(
            "Name",
            |t: &Team| t.name.clone(),
            move |field, name| {
                let exists = taken.contains(&name);
                let field = field.to_string();
                async move {
                    tokio::task::yield_now().await;
                    if exists {
                        Err(format!("'{}' must be unique.", field))
                    } else {
                        Ok(())
                    }
                }
            },
        );

        assert!(rules.validate(&team("PSV", 1913)).await.is_valid());
        let result = rules.validate(&team("Ajax", 1900)).await;
        assert_eq!(result.failures()[0].message, "'Name' must be unique.");
    }

    #[tokio::test]
    async fn test_rule_set_mixes_sync_and_async_in_declaration_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let rules = RuleSet::<Team>::new()
            .rule_async("A", |t: &Team| t.founded, move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("first".to_string()) }
            })
            .rule("B", |t: &Team| t.name.as_str(), |_: &str, _: &str| Err("second".to_string()))
            .rule_async("A", |_: &Team| (), |_, _| async { Err("third".to_string()) });

        let result = rules.validate(&team("Ajax", 1900)).await;
        let messages: Vec<_> = result.failures().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_rule_set_is_always_valid() {
        let rules = RuleSet::<Team>::default();
        assert!(rules.is_empty());
        assert!(rules.validate(&team("", -5)).await.is_valid());
    }
}
