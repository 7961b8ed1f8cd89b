//! Property schema, validation rules and the model factory.
//!
//! # Responsibility
//! - Hold the property defaults and validation rules of one entity kind.
//! - Instantiate populated `Model` values bound to that schema.
//!
//! # Invariants
//! - The schema is immutable once built and shared by every model of the kind.
//! - Every declared property carries exactly one rule; undeclared properties
//!   have no rule and can never be set.

use crate::model::instance::Model;
use crate::model::value::{Record, Value};
use log::debug;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

type Predicate = Rc<dyn Fn(&Value) -> bool>;

/// Validation rule attached to one declared property.
#[derive(Clone, Default)]
pub enum ValidationRule {
    /// Declared without validation: every value is accepted.
    #[default]
    Any,
    /// Value is accepted only when the predicate returns `true`.
    Predicate(Predicate),
}

impl ValidationRule {
    pub fn predicate(check: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::Predicate(Rc::new(check))
    }

    /// Accepts text values that are not blank.
    pub fn non_empty_text() -> Self {
        Self::predicate(|value| value.as_str().is_some_and(|text| !text.trim().is_empty()))
    }

    /// Accepts integers and `Null`.
    pub fn integer() -> Self {
        Self::predicate(|value| value.is_null() || value.as_i64().is_some())
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Predicate(check) => check(value),
        }
    }
}

impl Debug for ValidationRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "ValidationRule::Any"),
            Self::Predicate(_) => write!(f, "ValidationRule::Predicate(..)"),
        }
    }
}

/// Property defaults and rules for one entity kind.
#[derive(Debug, Default)]
pub struct Schema {
    defaults: Record,
    rules: BTreeMap<String, ValidationRule>,
}

impl Schema {
    /// Builds a schema where every property defaults to `Null`.
    pub fn new(rules: BTreeMap<String, ValidationRule>) -> Self {
        let defaults = rules
            .keys()
            .map(|property| (property.clone(), Value::Null))
            .collect();
        Self { defaults, rules }
    }

    pub fn defaults(&self) -> &Record {
        &self.defaults
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.defaults.contains_key(property)
    }

    /// Returns the rule for `property`, or `None` when it is not declared.
    pub fn rule(&self, property: &str) -> Option<&ValidationRule> {
        self.rules.get(property)
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.defaults.keys().map(String::as_str)
    }
}

/// Creates models for one entity kind.
#[derive(Debug, Clone)]
pub struct Factory {
    schema: Rc<Schema>,
}

impl Factory {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Rc::new(schema),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns a model seeded with schema defaults, then hydrated with `data`.
    ///
    /// Rejected properties keep their default; use `Model::hydrate` directly
    /// when the caller needs the rejected set.
    pub fn create(&self, data: &Record) -> Model {
        let mut model = Model::new(Rc::clone(&self.schema));
        let rejected = model.hydrate(data);
        if !rejected.is_empty() {
            debug!(
                "event=model_create module=model status=partial rejected={}",
                rejected.into_iter().collect::<Vec<_>>().join(",")
            );
        }
        model
    }

    /// Returns a transient model holding only schema defaults.
    pub fn create_empty(&self) -> Model {
        Model::new(Rc::clone(&self.schema))
    }
}

#[cfg(test)]
mod tests {
    use super::{Factory, Schema, ValidationRule};
    use crate::model::value::{Record, Value};
    use std::collections::BTreeMap;

    fn user_factory() -> Factory {
        let mut rules = BTreeMap::new();
        rules.insert("id".to_string(), ValidationRule::Any);
        rules.insert("firstName".to_string(), ValidationRule::non_empty_text());
        Factory::new(Schema::new(rules))
    }

    #[test]
    fn create_seeds_defaults_then_hydrates() {
        let factory = user_factory();
        let mut data = Record::new();
        data.insert("firstName".to_string(), Value::from("Ada"));

        let model = factory.create(&data);
        assert!(model.is_transient());
        assert_eq!(model.get("firstName").unwrap(), &Value::from("Ada"));
        assert_eq!(model.get("id").unwrap(), &Value::Null);
    }

    #[test]
    fn non_empty_text_rejects_blank_and_non_text() {
        let rule = ValidationRule::non_empty_text();
        assert!(rule.accepts(&Value::from("Ada")));
        assert!(!rule.accepts(&Value::from("   ")));
        assert!(!rule.accepts(&Value::Integer(3)));
        assert!(ValidationRule::Any.accepts(&Value::Null));
    }

    #[test]
    fn schema_defaults_every_property_to_null() {
        let factory = user_factory();
        let names: Vec<&str> = factory.schema().properties().collect();
        assert_eq!(names, vec!["firstName", "id"]);
        assert!(factory.schema().defaults().values().all(Value::is_null));
    }
}
