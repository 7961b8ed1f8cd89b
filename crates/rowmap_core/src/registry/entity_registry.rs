//! In-process entity registry.

use crate::error::{OrmError, OrmResult};
use crate::gateway::Gateway;
use crate::mapping::translator::{PropertyMap, Translator};
use crate::model::factory::{Factory, Schema};
use crate::model::instance::ID_PROPERTY;
use crate::registry::definition::EntityDefinition;
use crate::repo::repository::Repository;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Property name reserved for the full-state accessor of a model.
const RESERVED_DATA_PROPERTY: &str = "data";

static ENTITY_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid entity name regex"));
static PROPERTY_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][A-Za-z0-9]*$").expect("valid property name regex"));

/// Entity registration/lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidDefinition { entity: String, reason: String },
    DuplicateEntity(String),
    EntityNotRegistered(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDefinition { entity, reason } => {
                write!(f, "invalid definition for entity `{entity}`: {reason}")
            }
            Self::DuplicateEntity(name) => write!(f, "entity already registered: {name}"),
            Self::EntityNotRegistered(name) => write!(f, "entity not registered: {name}"),
        }
    }
}

impl Error for RegistryError {}

/// Translator, factory and repository bound to one entity name.
///
/// Built once at registration and never mutated afterwards.
pub struct Entity {
    name: String,
    translator: Rc<Translator>,
    factory: Rc<Factory>,
    repository: Repository,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}

/// Registry of entity kinds, keyed by name.
///
/// Duplicate names are rejected instead of overwritten.
#[derive(Default)]
pub struct EntityRegistry {
    entities: BTreeMap<String, Entity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `definition` and builds its translator/factory/repository.
    pub fn register(
        &mut self,
        definition: EntityDefinition,
        gateway: Rc<dyn Gateway>,
    ) -> OrmResult<()> {
        let name = definition.name.trim().to_string();
        validate_definition(&name, &definition)?;
        if self.entities.contains_key(name.as_str()) {
            return Err(RegistryError::DuplicateEntity(name).into());
        }

        let mut rules = BTreeMap::new();
        let mut maps = BTreeMap::new();
        for (property, spec) in definition.properties {
            rules.insert(property.clone(), spec.rule);
            maps.insert(property, PropertyMap::new(spec.table, spec.column));
        }

        let translator = Rc::new(Translator::new(gateway, maps)?.with_database(definition.database));
        let factory = Rc::new(Factory::new(Schema::new(rules)));
        let repository = Repository::new(Rc::clone(&translator), Rc::clone(&factory));

        info!(
            "event=entity_register module=registry status=ok entity={name} table={}",
            translator.table()
        );
        self.entities.insert(
            name.clone(),
            Entity {
                name,
                translator,
                factory,
                repository,
            },
        );
        Ok(())
    }

    /// Removes one entity, dropping its identity map.
    pub fn unregister(&mut self, name: &str) -> Result<Entity, RegistryError> {
        self.entities
            .remove(name.trim())
            .ok_or_else(|| RegistryError::EntityNotRegistered(name.trim().to_string()))
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn get(&self, name: &str) -> Result<&Entity, RegistryError> {
        self.entities
            .get(name.trim())
            .ok_or_else(|| RegistryError::EntityNotRegistered(name.trim().to_string()))
    }

    pub fn repository(&self, name: &str) -> Result<&Repository, RegistryError> {
        self.get(name).map(Entity::repository)
    }

    pub fn factory(&self, name: &str) -> Result<&Factory, RegistryError> {
        self.get(name).map(Entity::factory)
    }

    pub fn translator(&self, name: &str) -> Result<&Translator, RegistryError> {
        self.get(name).map(Entity::translator)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name.trim())
    }

    /// Returns sorted entity names.
    pub fn names(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn validate_definition(name: &str, definition: &EntityDefinition) -> Result<(), OrmError> {
    let invalid = |reason: String| -> OrmError {
        RegistryError::InvalidDefinition {
            entity: name.to_string(),
            reason,
        }
        .into()
    };

    if !ENTITY_NAME_RE.is_match(name) {
        return Err(invalid("name must match [a-z][a-z0-9_]*".to_string()));
    }
    let Some(id_spec) = definition.properties.get(ID_PROPERTY) else {
        return Err(invalid("missing `id` property".to_string()));
    };

    let mut columns = BTreeSet::new();
    for (property, spec) in &definition.properties {
        if property == RESERVED_DATA_PROPERTY {
            return Err(invalid(format!("`{property}` is a reserved property name")));
        }
        if !PROPERTY_NAME_RE.is_match(property) {
            return Err(invalid(format!(
                "property `{property}` must be a camelCase identifier"
            )));
        }
        if spec.column.trim().is_empty() {
            return Err(invalid(format!("property `{property}` has no column")));
        }
        if !columns.insert(spec.column.trim()) {
            return Err(invalid(format!(
                "property `{property}` reuses column `{}`",
                spec.column.trim()
            )));
        }
        if spec.table != id_spec.table {
            return Err(invalid(format!(
                "property `{property}` maps to table `{}` but the entity table is `{}`",
                spec.table, id_spec.table
            )));
        }
    }
    Ok(())
}
