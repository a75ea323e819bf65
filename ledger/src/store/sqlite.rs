//! SQLite-backed [`Store`] implementation.
//!
//! Every operation binds values as query parameters via `rusqlite`'s
//! `params!`/`params_from_iter!`, never by formatting values into SQL
//! text. Table and column names come only from [`ColumnDef`]s defined in
//! this crate, never from request input, so interpolating *those* into DDL
//! text carries no injection risk; only the payload *values* need binding,
//! and those always go through `rusqlite::types::Value`.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use super::{ColumnDef, Record, SqlType, Store, StoreError, Value};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

fn backend_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn sql_type_name(t: SqlType) -> &'static str {
    match t {
        SqlType::Integer => "INTEGER",
        SqlType::Real => "REAL",
        SqlType::Text => "TEXT",
        SqlType::Bool => "INTEGER",
    }
}

fn to_rusqlite_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Integer(v) => rusqlite::types::Value::Integer(*v),
        Value::Real(v) => rusqlite::types::Value::Real(*v),
        Value::Text(v) => rusqlite::types::Value::Text(v.clone()),
        Value::Bool(v) => rusqlite::types::Value::Integer(if *v { 1 } else { 0 }),
        Value::Null => rusqlite::types::Value::Null,
    }
}

fn from_value_ref(value_ref: rusqlite::types::ValueRef<'_>) -> Value {
    match value_ref {
        rusqlite::types::ValueRef::Null => Value::Null,
        rusqlite::types::ValueRef::Integer(i) => Value::Integer(i),
        rusqlite::types::ValueRef::Real(r) => Value::Real(r),
        rusqlite::types::ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        rusqlite::types::ValueRef::Blob(_) => Value::Null,
    }
}

impl Store for SqliteStore {
    fn ensure_table(&self, name: &str, schema: &[ColumnDef]) -> Result<(), StoreError> {
        let columns: Vec<String> = schema
            .iter()
            .map(|c| {
                let unique = if c.unique { " UNIQUE" } else { "" };
                format!("{} {}{}", c.name, sql_type_name(c.sql_type), unique)
            })
            .collect();
        let sql = format!("CREATE TABLE IF NOT EXISTS {name} ({})", columns.join(", "));
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        conn.execute(&sql, []).map_err(backend_err)?;
        Ok(())
    }

    fn get_all(&self, name: &str) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let sql = format!("SELECT * FROM {name}");
        let mut stmt = conn.prepare(&sql).map_err(backend_err)?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let rows = stmt
            .query_map([], |row| {
                let mut record = Record::new();
                for (i, col) in column_names.iter().enumerate() {
                    record.insert(col.clone(), from_value_ref(row.get_ref(i)?));
                }
                Ok(record)
            })
            .map_err(backend_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend_err)
    }

    fn get_one(&self, name: &str, column: &str, value: &Value) -> Result<Option<Record>, StoreError> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let sql = format!("SELECT * FROM {name} WHERE {column} = ?1");
        let mut stmt = conn.prepare(&sql).map_err(backend_err)?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let bound = to_rusqlite_value(value);
        let mut rows = stmt.query(rusqlite::params![bound]).map_err(backend_err)?;
        match rows.next().map_err(backend_err)? {
            Some(row) => {
                let mut record = Record::new();
                for (i, col) in column_names.iter().enumerate() {
                    record.insert(col.clone(), from_value_ref(row.get_ref(i).map_err(backend_err)?));
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn insert(&self, name: &str, values: &[(&str, Value)]) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {name} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", "),
        );
        let bound: Vec<rusqlite::types::Value> = values.iter().map(|(_, v)| to_rusqlite_value(v)).collect();
        conn.execute(&sql, rusqlite::params_from_iter(bound)).map_err(backend_err)?;
        Ok(())
    }

    fn delete_where(&self, name: &str, column: &str, value: &Value) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let sql = format!("DELETE FROM {name} WHERE {column} = ?1");
        conn.execute(&sql, rusqlite::params![to_rusqlite_value(value)]).map_err(backend_err)?;
        Ok(())
    }

    fn truncate(&self, name: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        conn.execute(&format!("DELETE FROM {name}"), []).map_err(backend_err)?;
        Ok(())
    }

    fn update_where(&self, name: &str, where_: (&str, Value), set: &[(&str, Value)]) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("sqlite store lock poisoned");
        let set_clauses: Vec<String> = set
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
            .collect();
        let where_index = set.len() + 1;
        let sql = format!(
            "UPDATE {name} SET {} WHERE {} = ?{where_index}",
            set_clauses.join(", "),
            where_.0,
        );
        let mut bound: Vec<rusqlite::types::Value> = set.iter().map(|(_, v)| to_rusqlite_value(v)).collect();
        bound.push(to_rusqlite_value(&where_.1));
        conn.execute(&sql, rusqlite::params_from_iter(bound)).map_err(backend_err)?;
        Ok(())
    }
}
