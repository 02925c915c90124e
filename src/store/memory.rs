//! In-memory store

use crate::error::StoreError;
use crate::schema::ModelDefinition;
use crate::store::{Persistence, QueryExecutor};
use crate::types::{Criteria, Row, Value};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<Row>,
    next_id: i64,
}

/// Process-local backend keyed by table name
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a table's rows, in insertion order
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

fn same_key(model: &ModelDefinition, a: &Row, b: &Row) -> bool {
    let keys = model.primary_keys();
    !keys.is_empty()
        && keys.iter().all(|k| {
            let value = a.get(*k).unwrap_or(&Value::Null);
            !value.is_null() && Some(value) == b.get(*k)
        })
}

#[async_trait]
impl QueryExecutor for MemoryStore {
    async fn execute(
        &self,
        model: &ModelDefinition,
        criteria: &Criteria,
    ) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read();
        let table = tables
            .get(model.table_name())
            .ok_or_else(|| StoreError::UnknownTable(model.table_name().to_string()))?;
        Ok(criteria.apply(table.rows.iter().cloned()))
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn register(&self, model: &ModelDefinition) -> Result<(), StoreError> {
        self.tables
            .write()
            .entry(model.table_name().to_string())
            .or_insert_with(|| MemoryTable {
                rows: Vec::new(),
                next_id: 1,
            });
        Ok(())
    }

    async fn truncate(&self, model: &ModelDefinition) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(model.table_name())
            .ok_or_else(|| StoreError::UnknownTable(model.table_name().to_string()))?;
        table.rows.clear();
        table.next_id = 1;
        Ok(())
    }

    async fn insert(&self, model: &ModelDefinition, mut values: Row) -> Result<Row, StoreError> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(model.table_name())
            .ok_or_else(|| StoreError::UnknownTable(model.table_name().to_string()))?;

        if let Some(column) = model.auto_increment_column() {
            match values.get(column).and_then(Value::as_i64) {
                Some(explicit) => table.next_id = table.next_id.max(explicit.saturating_add(1)),
                None => {
                    values.insert(column.to_string(), Value::from(table.next_id));
                    table.next_id += 1;
                }
            }
        }

        if table.rows.iter().any(|r| same_key(model, r, &values)) {
            return Err(StoreError::ConstraintViolation {
                table: model.table_name().to_string(),
                message: "duplicate primary key".to_string(),
            });
        }

        table.rows.push(values.clone());
        Ok(values)
    }

    async fn update(
        &self,
        model: &ModelDefinition,
        criteria: &Criteria,
        values: Row,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(model.table_name())
            .ok_or_else(|| StoreError::UnknownTable(model.table_name().to_string()))?;

        let mut touched = 0;
        for row in table.rows.iter_mut().filter(|r| criteria.matches(r)) {
            for (column, value) in &values {
                row.insert(column.clone(), value.clone());
            }
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete(
        &self,
        model: &ModelDefinition,
        criteria: &Criteria,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(model.table_name())
            .ok_or_else(|| StoreError::UnknownTable(model.table_name().to_string()))?;

        let before = table.rows.len();
        table.rows.retain(|r| !criteria.matches(r));
        Ok((before - table.rows.len()) as u64)
    }
}
