//! Property/column mapping between models and the storage gateway.
//!
//! # Responsibility
//! - Own the camelCase <-> snake_case naming convention.
//! - Forward CRUD requests to the gateway in column vocabulary.
//!
//! # Invariants
//! - One entity maps to exactly one table.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod naming;
pub mod translator;

/// Mapping construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// No mapping declared for the `id` property, so the table is unknown.
    MissingIdMapping,
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdMapping => write!(f, "mapping declares no `id` property"),
        }
    }
}

impl Error for MappingError {}
