//! Model layer: dynamic values, per-entity schemas and model instances.
//!
//! # Responsibility
//! - Define the value/record shapes exchanged across the mapping pipeline.
//! - Own validation of property mutations.
//!
//! # Invariants
//! - Models never mutate the schema they are bound to.
//! - A model is persisted once its `id` property is non-null.

pub mod factory;
pub mod instance;
pub mod value;
