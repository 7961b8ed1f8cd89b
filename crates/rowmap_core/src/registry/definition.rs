//! Entity registration input.

use crate::gateway::DEFAULT_DATABASE;
use crate::model::factory::ValidationRule;
use std::collections::BTreeMap;

/// Validation rule and storage location of one property.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub rule: ValidationRule,
    pub table: String,
    pub column: String,
}

impl PropertySpec {
    /// Property stored in `table.column`, accepting every value.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            rule: ValidationRule::Any,
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rule = rule;
        self
    }
}

/// Declarative description of one entity kind.
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    pub name: String,
    /// Gateway database the entity's table lives in.
    pub database: String,
    pub properties: BTreeMap<String, PropertySpec>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: DEFAULT_DATABASE.to_string(),
            properties: BTreeMap::new(),
        }
    }

    pub fn property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    pub fn on_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}
