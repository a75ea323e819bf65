//! Abstract tabular CRUD driver.
//!
//! The Ledger and [`crate::user_directory`] depend only on this narrow
//! contract — never on raw SQL. Every concrete implementation MUST bind
//! values as query parameters rather than interpolating them into query
//! text; see `DESIGN.md` for why this replaces the reference's ad-hoc
//! string-assembled SQL.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;
use std::fmt;

/// A column value as stored or retrieved through the [`Store`] contract.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }
}

/// One row, keyed by column name. `BTreeMap` keeps iteration order stable,
/// which matters for the in-memory store's tests and for reproducible logs.
pub type Record = BTreeMap<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Bool,
}

#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub unique: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self { name, sql_type, unique: false }
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug)]
pub enum StoreError {
    Backend(String),
    UnknownTable(String),
    UnknownColumn(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
            StoreError::UnknownTable(name) => write!(f, "unknown table: {name}"),
            StoreError::UnknownColumn(name) => write!(f, "unknown column: {name}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Narrow CRUD contract over named tabular collections.
///
/// One logical instance per node backs the chain + open-transaction
/// tables; one shared instance backs the user directory. Implementations
/// MUST serialize writes at the table level.
pub trait Store: Send + Sync {
    fn ensure_table(&self, name: &str, schema: &[ColumnDef]) -> Result<(), StoreError>;
    fn get_all(&self, name: &str) -> Result<Vec<Record>, StoreError>;
    fn get_one(&self, name: &str, column: &str, value: &Value) -> Result<Option<Record>, StoreError>;
    fn insert(&self, name: &str, values: &[(&str, Value)]) -> Result<(), StoreError>;
    fn delete_where(&self, name: &str, column: &str, value: &Value) -> Result<(), StoreError>;
    fn truncate(&self, name: &str) -> Result<(), StoreError>;
    fn update_where(&self, name: &str, where_: (&str, Value), set: &[(&str, Value)]) -> Result<(), StoreError>;
}
