//! Schema-bound model instances and the shared handle handed out by repositories.
//!
//! # Responsibility
//! - Store property values for one entity instance.
//! - Validate every mutation against the shared schema.
//!
//! # Invariants
//! - The property set is fixed by the schema; unknown names are never stored.
//! - A rejected value leaves the prior value in place.
//! - `id == Null` marks a transient (never persisted) model.

use crate::model::factory::Schema;
use crate::model::value::{Record, Value};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Property name of the primary key.
pub const ID_PROPERTY: &str = "id";

/// Property access errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The schema declares no such property.
    UnknownProperty(String),
    /// The property's validation rule refused the value.
    Rejected(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProperty(property) => write!(f, "unknown property: {property}"),
            Self::Rejected(property) => write!(f, "value rejected for property: {property}"),
        }
    }
}

impl Error for ModelError {}

/// Mutable bag of property values for one entity instance.
#[derive(Debug, Clone)]
pub struct Model {
    schema: Rc<Schema>,
    properties: Record,
}

impl Model {
    pub(crate) fn new(schema: Rc<Schema>) -> Self {
        let properties = schema.defaults().clone();
        Self { schema, properties }
    }

    /// Applies every known key of `data` through `set`.
    ///
    /// Unknown keys are skipped. Returns the properties whose values were
    /// rejected; those keep their prior value and accepted ones stay applied.
    pub fn hydrate(&mut self, data: &Record) -> BTreeSet<String> {
        let mut rejected = BTreeSet::new();
        for (property, value) in data {
            if !self.schema.has_property(property) {
                continue;
            }
            if self.set(property, value.clone()).is_err() {
                rejected.insert(property.clone());
            }
        }
        rejected
    }

    /// Validates and stores one property value.
    pub fn set(&mut self, property: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let value = value.into();
        let Some(rule) = self.schema.rule(property) else {
            return Err(ModelError::UnknownProperty(property.to_string()));
        };
        if !rule.accepts(&value) {
            return Err(ModelError::Rejected(property.to_string()));
        }
        self.properties.insert(property.to_string(), value);
        Ok(())
    }

    pub fn get(&self, property: &str) -> Result<&Value, ModelError> {
        self.properties
            .get(property)
            .ok_or_else(|| ModelError::UnknownProperty(property.to_string()))
    }

    /// Full `property -> value` state, used to build write payloads.
    pub fn data(&self) -> &Record {
        &self.properties
    }

    pub fn id(&self) -> Option<i64> {
        self.properties.get(ID_PROPERTY).and_then(Value::as_id)
    }

    pub fn is_transient(&self) -> bool {
        self.properties
            .get(ID_PROPERTY)
            .map_or(true, Value::is_null)
    }
}

/// Shared handle to one in-memory model.
///
/// Clones point at the same instance, so a mutation through one handle is
/// visible through every other. Single-threaded by construction.
#[derive(Debug, Clone)]
pub struct ModelHandle(Rc<RefCell<Model>>);

impl ModelHandle {
    pub fn new(model: Model) -> Self {
        Self(Rc::new(RefCell::new(model)))
    }

    pub fn borrow(&self) -> Ref<'_, Model> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Model> {
        self.0.borrow_mut()
    }

    /// Returns a copy of one property value.
    pub fn get(&self, property: &str) -> Result<Value, ModelError> {
        self.0.borrow().get(property).cloned()
    }

    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        self.0.borrow_mut().set(property, value)
    }

    pub fn hydrate(&self, data: &Record) -> BTreeSet<String> {
        self.0.borrow_mut().hydrate(data)
    }

    /// Returns a copy of the full property state.
    pub fn data(&self) -> Record {
        self.0.borrow().data().clone()
    }

    pub fn id(&self) -> Option<i64> {
        self.0.borrow().id()
    }

    /// Returns whether both handles point at the same in-memory instance.
    pub fn same_instance(&self, other: &ModelHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Model> for ModelHandle {
    fn from(model: Model) -> Self {
        Self::new(model)
    }
}
