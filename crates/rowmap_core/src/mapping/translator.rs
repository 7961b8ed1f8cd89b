//! Property <-> column translation in front of a gateway.
//!
//! # Responsibility
//! - Translate property-keyed payloads to column-keyed requests and back.
//! - Pin every request to the entity's table and database.
//!
//! # Invariants
//! - The entity's table is the table mapped for the `id` property.
//! - Declared column mappings win over the naming convention.

use crate::gateway::{Gateway, GatewayResult, QueryParams, WhereClause, DEFAULT_DATABASE};
use crate::mapping::naming::{column_to_property, property_to_column};
use crate::mapping::MappingError;
use crate::model::instance::ID_PROPERTY;
use crate::model::value::Record;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Storage location of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMap {
    pub table: String,
    pub column: String,
}

impl PropertyMap {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Bridges model properties and storage columns for one entity.
pub struct Translator {
    gateway: Rc<dyn Gateway>,
    maps: BTreeMap<String, PropertyMap>,
    properties_by_column: BTreeMap<String, String>,
    table: String,
    database: String,
}

impl Translator {
    pub fn new(
        gateway: Rc<dyn Gateway>,
        maps: BTreeMap<String, PropertyMap>,
    ) -> Result<Self, MappingError> {
        let table = maps
            .get(ID_PROPERTY)
            .map(|map| map.table.clone())
            .ok_or(MappingError::MissingIdMapping)?;
        let properties_by_column = maps
            .iter()
            .map(|(property, map)| (map.column.clone(), property.clone()))
            .collect();

        Ok(Self {
            gateway,
            maps,
            properties_by_column,
            table,
            database: DEFAULT_DATABASE.to_string(),
        })
    }

    /// Routes every request to `database` instead of the default one.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Column backing `property`, falling back to the naming convention.
    pub fn column_for(&self, property: &str) -> String {
        self.maps
            .get(property)
            .map_or_else(|| property_to_column(property), |map| map.column.clone())
    }

    /// Property backed by `column`, falling back to the naming convention.
    pub fn property_for(&self, column: &str) -> String {
        self.properties_by_column
            .get(column)
            .cloned()
            .unwrap_or_else(|| column_to_property(column))
    }

    pub fn id_column(&self) -> String {
        self.column_for(ID_PROPERTY)
    }

    /// Inserts `data` and returns the stored row, property-keyed.
    ///
    /// A null `id` is left out so storage assigns one. Returns `None` when
    /// the gateway reports that nothing was inserted.
    pub fn create(&self, data: &Record) -> GatewayResult<Option<Record>> {
        let mut columns = self.to_columns(data);
        let id_column = self.id_column();
        if columns.get(&id_column).is_some_and(|value| value.is_null()) {
            columns.remove(&id_column);
        }

        let params = self.pin(QueryParams::new().data(columns));
        if !self.gateway.create(&params)? {
            warn!(
                "event=translator_create module=mapping status=empty table={}",
                self.table
            );
            return Ok(None);
        }

        let id = self
            .gateway
            .last_insert_id(Some(id_column.as_str()), &self.database)?;
        debug!(
            "event=translator_create module=mapping status=ok table={} id={id}",
            self.table
        );
        let rows = self.read(QueryParams::new().filter(WhereClause::eq(id_column, id)))?;
        Ok(rows.into_iter().next())
    }

    /// Reads rows from the entity's table and returns them property-keyed.
    pub fn read(&self, params: QueryParams) -> GatewayResult<Vec<Record>> {
        let params = self.pin(params);
        let rows = self.gateway.read(&params)?;
        Ok(rows.into_iter().map(|row| self.to_properties(row)).collect())
    }

    pub fn update(&self, mut params: QueryParams) -> GatewayResult<bool> {
        params.data = self.to_columns(&params.data);
        let params = self.pin(params);
        self.gateway.update(&params)
    }

    pub fn delete(&self, mut params: QueryParams) -> GatewayResult<bool> {
        params.data = self.to_columns(&params.data);
        let params = self.pin(params);
        self.gateway.delete(&params)
    }

    fn pin(&self, mut params: QueryParams) -> QueryParams {
        params.table = self.table.clone();
        params.database = self.database.clone();
        params
    }

    fn to_columns(&self, data: &Record) -> Record {
        data.iter()
            .map(|(property, value)| (self.column_for(property), value.clone()))
            .collect()
    }

    fn to_properties(&self, row: Record) -> Record {
        row.into_iter()
            .map(|(column, value)| (self.property_for(&column), value))
            .collect()
    }
}
