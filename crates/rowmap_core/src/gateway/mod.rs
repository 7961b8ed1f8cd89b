//! Storage gateway protocol and request shapes.
//!
//! # Responsibility
//! - Define the narrow CRUD contract the mapping core talks to.
//! - Keep connection handling and SQL dialect details behind that contract.
//!
//! # Invariants
//! - Every request names its target `table`.
//! - Storage-level "nothing happened" is `Ok(false)` or an empty row set;
//!   `Err` is reserved for driver failures.
//! - `where_clauses` order is the order clauses are rendered in.

use crate::model::value::{Record, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod sqlite;

pub use sqlite::{DatabaseTarget, SqliteGateway, SqliteGatewayConfig};

/// Database name used when a request does not name one.
pub const DEFAULT_DATABASE: &str = "default";

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Driver-side failures surfaced by a gateway.
#[derive(Debug)]
pub enum GatewayError {
    /// The request names a database the gateway is not configured for.
    UnknownDatabase(String),
    /// The request cannot be rendered (bad identifier, empty update set, ...).
    InvalidRequest(String),
    Sqlite(rusqlite::Error),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDatabase(name) => write!(f, "database is not configured: {name}"),
            Self::InvalidRequest(message) => write!(f, "invalid gateway request: {message}"),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnknownDatabase(_) | Self::InvalidRequest(_) => None,
        }
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Boolean connective joining a clause to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Comparison operator of one filter clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Operator {
    #[default]
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
        }
    }
}

/// One flat filter clause: `[condition] column operator value`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub condition: Option<Connective>,
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl WhereClause {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            condition: None,
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Equality clause, the common case for primary-key lookups.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    pub fn with_condition(mut self, condition: Connective) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Parameters of one CRUD request.
///
/// `data` is only meaningful for create/update; `columns`, `order_by`,
/// `order` and `limit` only for reads. Empty `columns` selects every column.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub database: String,
    pub table: String,
    pub columns: Vec<String>,
    pub data: Record,
    pub where_clauses: Vec<WhereClause>,
    pub order_by: Option<String>,
    pub order: SortOrder,
    pub limit: Option<u32>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            table: String::new(),
            columns: Vec::new(),
            data: Record::new(),
            where_clauses: Vec::new(),
            order_by: None,
            order: SortOrder::Asc,
            limit: None,
        }
    }
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn data(mut self, data: Record) -> Self {
        self.data = data;
        self
    }

    /// Appends one filter clause, keeping caller order.
    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.where_clauses.push(clause);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(column.into());
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// CRUD protocol implemented by storage drivers.
///
/// Implementations own connection lifecycle, pooling and SQL dialect.
/// `connect`/`disconnect` must be idempotent.
pub trait Gateway {
    fn connect(&self, database: &str) -> GatewayResult<()>;
    fn disconnect(&self, database: &str) -> GatewayResult<()>;
    /// Identifier assigned by the most recent successful insert.
    fn last_insert_id(&self, sequence: Option<&str>, database: &str) -> GatewayResult<i64>;
    fn create(&self, params: &QueryParams) -> GatewayResult<bool>;
    /// Returns column-keyed rows in storage order.
    fn read(&self, params: &QueryParams) -> GatewayResult<Vec<Record>>;
    fn update(&self, params: &QueryParams) -> GatewayResult<bool>;
    fn delete(&self, params: &QueryParams) -> GatewayResult<bool>;
}
