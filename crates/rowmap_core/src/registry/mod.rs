//! Entity registration and lookup.
//!
//! # Responsibility
//! - Turn an `EntityDefinition` into its translator/factory/repository triad.
//! - Resolve registered entities by name.
//!
//! # Invariants
//! - Names are unique; re-registering a name fails with `DuplicateEntity`.
//! - Every registered entity maps to exactly one table, the `id` property's.

pub mod definition;
pub mod entity_registry;

pub use definition::{EntityDefinition, PropertySpec};
pub use entity_registry::{Entity, EntityRegistry, RegistryError};
