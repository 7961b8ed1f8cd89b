//! SQLite-backed gateway.
//!
//! # Responsibility
//! - Manage one lazily opened connection per configured database name.
//! - Render CRUD requests into parameterized SQL and bind values in order.
//!
//! # Invariants
//! - Identifiers are validated and quoted; values are only ever bound.
//! - A non-first clause without a connective is joined with `AND`.
//! - Write operations report `true` only when at least one row changed.

use super::open::open_target;
use super::{
    Connective, Gateway, GatewayError, GatewayResult, Operator, QueryParams, WhereClause,
    DEFAULT_DATABASE,
};
use crate::model::value::{Record, Value};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Where one named database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseTarget {
    File(PathBuf),
    /// Private in-memory database; its content is lost on disconnect.
    Memory,
}

impl DatabaseTarget {
    pub(super) fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Named database targets served by one gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteGatewayConfig {
    pub databases: BTreeMap<String, DatabaseTarget>,
}

impl SqliteGatewayConfig {
    /// One in-memory database registered as `default`.
    pub fn in_memory() -> Self {
        Self::default().with_database(DEFAULT_DATABASE, DatabaseTarget::Memory)
    }

    /// One file database registered as `default`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::default().with_database(DEFAULT_DATABASE, DatabaseTarget::File(path.into()))
    }

    pub fn with_database(mut self, name: impl Into<String>, target: DatabaseTarget) -> Self {
        self.databases.insert(name.into(), target);
        self
    }
}

/// Gateway over `rusqlite` connections.
///
/// Not thread-safe: callers needing concurrency use one gateway per thread.
pub struct SqliteGateway {
    config: SqliteGatewayConfig,
    connections: RefCell<BTreeMap<String, Connection>>,
}

impl SqliteGateway {
    pub fn new(config: SqliteGatewayConfig) -> Self {
        Self {
            config,
            connections: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &SqliteGatewayConfig {
        &self.config
    }

    pub fn is_connected(&self, database: &str) -> bool {
        self.connections.borrow().contains_key(database)
    }

    /// Runs raw SQL statements, e.g. schema bootstrap for demos and tests.
    pub fn execute_batch(&self, database: &str, sql: &str) -> GatewayResult<()> {
        self.with_connection(database, |conn| Ok(conn.execute_batch(sql)?))
    }

    fn with_connection<T>(
        &self,
        database: &str,
        run: impl FnOnce(&Connection) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        self.connect(database)?;
        let connections = self.connections.borrow();
        let conn = connections
            .get(database)
            .ok_or_else(|| GatewayError::UnknownDatabase(database.to_string()))?;
        run(conn)
    }

    fn execute(&self, database: &str, sql: &str, binds: &[Value]) -> GatewayResult<usize> {
        self.with_connection(database, |conn| {
            Ok(conn.execute(sql, params_from_iter(binds.iter()))?)
        })
    }
}

impl Gateway for SqliteGateway {
    fn connect(&self, database: &str) -> GatewayResult<()> {
        if self.is_connected(database) {
            return Ok(());
        }
        let target = self
            .config
            .databases
            .get(database)
            .ok_or_else(|| GatewayError::UnknownDatabase(database.to_string()))?;
        let conn = open_target(database, target)?;
        self.connections
            .borrow_mut()
            .insert(database.to_string(), conn);
        Ok(())
    }

    fn disconnect(&self, database: &str) -> GatewayResult<()> {
        if self.connections.borrow_mut().remove(database).is_some() {
            info!("event=db_close module=gateway status=ok database={database}");
        }
        Ok(())
    }

    fn last_insert_id(&self, sequence: Option<&str>, database: &str) -> GatewayResult<i64> {
        if let Some(sequence) = sequence {
            debug!("event=last_insert_id module=gateway sequence_ignored={sequence}");
        }
        self.with_connection(database, |conn| Ok(conn.last_insert_rowid()))
    }

    fn create(&self, params: &QueryParams) -> GatewayResult<bool> {
        let (sql, binds) = build_insert(params)?;
        let changed = self.execute(&params.database, &sql, &binds)?;
        debug!(
            "event=gateway_create module=gateway status=ok table={} changed={changed}",
            params.table
        );
        Ok(changed > 0)
    }

    fn read(&self, params: &QueryParams) -> GatewayResult<Vec<Record>> {
        let (sql, binds) = build_select(params)?;
        let records = self.with_connection(&params.database, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let column_names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let mut rows = stmt.query(params_from_iter(binds.iter()))?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Record::new();
                for (index, name) in column_names.iter().enumerate() {
                    record.insert(name.clone(), value_from_ref(row.get_ref(index)?));
                }
                records.push(record);
            }
            Ok(records)
        })?;
        debug!(
            "event=gateway_read module=gateway status=ok table={} rows={}",
            params.table,
            records.len()
        );
        Ok(records)
    }

    fn update(&self, params: &QueryParams) -> GatewayResult<bool> {
        let (sql, binds) = build_update(params)?;
        let changed = self.execute(&params.database, &sql, &binds)?;
        debug!(
            "event=gateway_update module=gateway status=ok table={} changed={changed}",
            params.table
        );
        Ok(changed > 0)
    }

    fn delete(&self, params: &QueryParams) -> GatewayResult<bool> {
        let (sql, binds) = build_delete(params)?;
        let changed = self.execute(&params.database, &sql, &binds)?;
        debug!(
            "event=gateway_delete module=gateway status=ok table={} changed={changed}",
            params.table
        );
        Ok(changed > 0)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(value) => ToSqlOutput::Owned(SqlValue::Integer(*value)),
            Value::Real(value) => ToSqlOutput::Owned(SqlValue::Real(*value)),
            Value::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            Value::Blob(value) => ToSqlOutput::Borrowed(ValueRef::Blob(value)),
        })
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Integer(value),
        ValueRef::Real(value) => Value::Real(value),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

fn quote_identifier(name: &str) -> GatewayResult<String> {
    if !IDENTIFIER_RE.is_match(name) {
        return Err(GatewayError::InvalidRequest(format!(
            "invalid identifier `{name}`"
        )));
    }
    Ok(format!("\"{name}\""))
}

fn build_insert(params: &QueryParams) -> GatewayResult<(String, Vec<Value>)> {
    let table = quote_identifier(&params.table)?;
    if params.data.is_empty() {
        return Ok((format!("INSERT INTO {table} DEFAULT VALUES"), Vec::new()));
    }

    let mut columns = Vec::with_capacity(params.data.len());
    let mut binds = Vec::with_capacity(params.data.len());
    for (column, value) in &params.data {
        columns.push(quote_identifier(column)?);
        binds.push(value.clone());
    }
    let placeholders = vec!["?"; binds.len()].join(", ");
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    Ok((sql, binds))
}

fn build_select(params: &QueryParams) -> GatewayResult<(String, Vec<Value>)> {
    let table = quote_identifier(&params.table)?;
    let columns = if params.columns.is_empty() {
        "*".to_string()
    } else {
        params
            .columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<GatewayResult<Vec<_>>>()?
            .join(", ")
    };

    let mut sql = format!("SELECT {columns} FROM {table}");
    let mut binds = Vec::new();
    render_where(&params.where_clauses, &mut sql, &mut binds)?;

    if let Some(order_by) = &params.order_by {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            quote_identifier(order_by)?,
            params.order.as_sql()
        ));
    }
    if let Some(limit) = params.limit {
        sql.push_str(" LIMIT ?");
        binds.push(Value::from(limit));
    }
    Ok((sql, binds))
}

fn build_update(params: &QueryParams) -> GatewayResult<(String, Vec<Value>)> {
    let table = quote_identifier(&params.table)?;
    if params.data.is_empty() {
        return Err(GatewayError::InvalidRequest(format!(
            "update on `{}` has no data",
            params.table
        )));
    }

    let mut assignments = Vec::with_capacity(params.data.len());
    let mut binds = Vec::with_capacity(params.data.len());
    for (column, value) in &params.data {
        assignments.push(format!("{} = ?", quote_identifier(column)?));
        binds.push(value.clone());
    }
    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
    render_where(&params.where_clauses, &mut sql, &mut binds)?;
    Ok((sql, binds))
}

fn build_delete(params: &QueryParams) -> GatewayResult<(String, Vec<Value>)> {
    let mut sql = format!("DELETE FROM {}", quote_identifier(&params.table)?);
    let mut binds = Vec::new();
    render_where(&params.where_clauses, &mut sql, &mut binds)?;
    Ok((sql, binds))
}

fn render_where(
    clauses: &[WhereClause],
    sql: &mut String,
    binds: &mut Vec<Value>,
) -> GatewayResult<()> {
    if clauses.is_empty() {
        return Ok(());
    }

    sql.push_str(" WHERE ");
    for (index, clause) in clauses.iter().enumerate() {
        if index > 0 {
            let connective = clause.condition.unwrap_or(Connective::And);
            sql.push_str(&format!(" {} ", connective.as_sql()));
        }
        let column = quote_identifier(&clause.column)?;
        match (clause.operator, clause.value.is_null()) {
            (Operator::Eq, true) => sql.push_str(&format!("{column} IS NULL")),
            (Operator::NotEq, true) => sql.push_str(&format!("{column} IS NOT NULL")),
            (operator, _) => {
                sql.push_str(&format!("{column} {} ?", operator.as_sql()));
                binds.push(clause.value.clone());
            }
        }
    }
    Ok(())
}
