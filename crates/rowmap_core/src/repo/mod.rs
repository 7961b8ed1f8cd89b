//! Repository layer: identity-mapped CRUD orchestration per entity kind.
//!
//! # Responsibility
//! - Keep one in-memory model per persisted id.
//! - Hide translator/factory wiring from callers.
//!
//! # Invariants
//! - Storage failures surface as `None`/`false`/empty results; driver errors
//!   propagate unchanged as `OrmError::Gateway`.

pub mod repository;
