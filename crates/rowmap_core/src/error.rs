//! Crate-level error type.
//!
//! # Invariants
//! - Validation failures are never errors: they are reported as rejected
//!   property sets by `Model::hydrate`.
//! - Gateway errors pass through untouched; the core never interprets them.

use crate::gateway::GatewayError;
use crate::mapping::MappingError;
use crate::registry::RegistryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OrmResult<T> = Result<T, OrmError>;

#[derive(Debug)]
pub enum OrmError {
    Registry(RegistryError),
    Mapping(MappingError),
    Gateway(GatewayError),
}

impl Display for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registry(err) => write!(f, "{err}"),
            Self::Mapping(err) => write!(f, "{err}"),
            Self::Gateway(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OrmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(err) => Some(err),
            Self::Mapping(err) => Some(err),
            Self::Gateway(err) => Some(err),
        }
    }
}

impl From<RegistryError> for OrmError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<MappingError> for OrmError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(value)
    }
}

impl From<GatewayError> for OrmError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}
