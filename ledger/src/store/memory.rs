//! In-memory [`Store`] implementation used by unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{ColumnDef, Record, Store, StoreError, Value};

struct Table {
    schema: Vec<ColumnDef>,
    rows: Vec<Record>,
}

/// A `Store` backed by an in-process `HashMap`, with no persistence.
///
/// Mirrors [`crate::store::sqlite::SqliteStore`]'s semantics exactly so
/// tests can swap one for the other without changing Ledger behavior.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn ensure_table(&self, name: &str, schema: &[ColumnDef]) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("memory store lock poisoned");
        tables.entry(name.to_string()).or_insert_with(|| Table {
            schema: schema.to_vec(),
            rows: Vec::new(),
        });
        Ok(())
    }

    fn get_all(&self, name: &str) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.lock().expect("memory store lock poisoned");
        let table = tables.get(name).ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        Ok(table.rows.clone())
    }

    fn get_one(&self, name: &str, column: &str, value: &Value) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.lock().expect("memory store lock poisoned");
        let table = tables.get(name).ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        Ok(table.rows.iter().find(|row| row.get(column) == Some(value)).cloned())
    }

    fn insert(&self, name: &str, values: &[(&str, Value)]) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("memory store lock poisoned");
        let table = tables.get_mut(name).ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        for (column, _) in values {
            if !table.schema.iter().any(|c| c.name == *column) {
                return Err(StoreError::UnknownColumn(column.to_string()));
            }
        }
        let mut row = Record::new();
        for (column, value) in values {
            row.insert(column.to_string(), value.clone());
        }
        table.rows.push(row);
        Ok(())
    }

    fn delete_where(&self, name: &str, column: &str, value: &Value) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("memory store lock poisoned");
        let table = tables.get_mut(name).ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        table.rows.retain(|row| row.get(column) != Some(value));
        Ok(())
    }

    fn truncate(&self, name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("memory store lock poisoned");
        let table = tables.get_mut(name).ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        table.rows.clear();
        Ok(())
    }

    fn update_where(&self, name: &str, where_: (&str, Value), set: &[(&str, Value)]) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("memory store lock poisoned");
        let table = tables.get_mut(name).ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        for (column, _) in set {
            if !table.schema.iter().any(|c| c.name == *column) {
                return Err(StoreError::UnknownColumn(column.to_string()));
            }
        }
        let (where_col, where_val) = where_;
        for row in table.rows.iter_mut().filter(|row| row.get(where_col) == Some(&where_val)) {
            for (column, value) in set {
                row.insert(column.to_string(), value.clone());
            }
        }
        Ok(())
    }
}
