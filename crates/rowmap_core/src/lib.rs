//! Minimal object-relational mapping core.
//!
//! Register named entities, each backed by one table, then create, fetch,
//! update and delete schema-validated models through an identity-mapped
//! repository. Storage access goes through the `Gateway` protocol; a SQLite
//! implementation ships in `gateway::sqlite`.

pub mod error;
pub mod gateway;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod registry;
pub mod repo;

pub use error::{OrmError, OrmResult};
pub use gateway::{
    Connective, DatabaseTarget, Gateway, GatewayError, GatewayResult, Operator, QueryParams,
    SortOrder, SqliteGateway, SqliteGatewayConfig, WhereClause, DEFAULT_DATABASE,
};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingConfig,
    LoggingError,
};
pub use mapping::naming::{column_to_property, property_to_column};
pub use mapping::translator::{PropertyMap, Translator};
pub use mapping::MappingError;
pub use model::factory::{Factory, Schema, ValidationRule};
pub use model::instance::{Model, ModelError, ModelHandle, ID_PROPERTY};
pub use model::value::{Record, Value};
pub use registry::{Entity, EntityDefinition, EntityRegistry, PropertySpec, RegistryError};
pub use repo::repository::Repository;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
