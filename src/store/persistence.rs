//! Sled-backed persistence
//!
//! One sled tree per table. Rows are stored as JSON under a key built from the
//! primary key values; auto-increment columns draw from a per-table sequence.

use crate::error::StoreError;
use crate::schema::ModelDefinition;
use crate::store::{Persistence, QueryExecutor};
use crate::types::{Criteria, Row, Value};
use async_trait::async_trait;
use std::path::Path;

const TABLES_TREE: &str = "__tables";
const SEQUENCES_TREE: &str = "__sequences";

/// Table layout needed by the blocking workers
#[derive(Debug, Clone)]
struct TableLayout {
    name: String,
    primary_keys: Vec<String>,
    auto_increment: Option<String>,
}

impl TableLayout {
    fn of(model: &ModelDefinition) -> Self {
        Self {
            name: model.table_name().to_string(),
            primary_keys: model.primary_keys().into_iter().map(str::to_string).collect(),
            auto_increment: model.auto_increment_column().map(str::to_string),
        }
    }

    /// Storage key: JSON array of the primary key values
    fn key(&self, row: &Row) -> Result<Vec<u8>, StoreError> {
        let values: Vec<&Value> = self
            .primary_keys
            .iter()
            .map(|k| row.get(k).unwrap_or(&Value::Null))
            .collect();
        if values.is_empty() || values.iter().any(|v| v.is_null()) {
            return Err(StoreError::ConstraintViolation {
                table: self.name.clone(),
                message: "primary key value missing".to_string(),
            });
        }
        Ok(serde_json::to_vec(&values)?)
    }
}

/// Sled-based implementation of the storage collaborators
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) a store at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Temporary store, removed when dropped
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn table(&self, layout: &TableLayout) -> Result<sled::Tree, StoreError> {
        if !self.db.open_tree(TABLES_TREE)?.contains_key(layout.name.as_bytes())? {
            return Err(StoreError::UnknownTable(layout.name.clone()));
        }
        Ok(self.db.open_tree(layout.name.as_bytes())?)
    }
}

/// Run a sled operation off the async worker threads
async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Backend(format!("Blocking task failed: {}", e)))?
}

fn decode(bytes: &[u8]) -> Result<Row, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn scan(tree: &sled::Tree, criteria: &Criteria) -> Result<Vec<(sled::IVec, Row)>, StoreError> {
    let mut matching = Vec::new();
    for item in tree.iter() {
        let (key, value) = item?;
        let row = decode(&value)?;
        if criteria.matches(&row) {
            matching.push((key, row));
        }
    }
    Ok(matching)
}

#[async_trait]
impl QueryExecutor for SledStore {
    async fn execute(
        &self,
        model: &ModelDefinition,
        criteria: &Criteria,
    ) -> Result<Vec<Row>, StoreError> {
        let tree = self.table(&TableLayout::of(model))?;
        let criteria = criteria.clone();
        blocking(move || {
            let rows = scan(&tree, &criteria)?.into_iter().map(|(_, row)| row);
            Ok(match criteria.limit {
                Some(n) => rows.take(n).collect(),
                None => rows.collect(),
            })
        })
        .await
    }
}

#[async_trait]
impl Persistence for SledStore {
    async fn register(&self, model: &ModelDefinition) -> Result<(), StoreError> {
        let name = model.table_name().as_bytes().to_vec();
        self.db
            .open_tree(TABLES_TREE)?
            .insert(name.as_slice(), Vec::<u8>::new())?;
        self.db.open_tree(name)?;
        Ok(())
    }

    async fn truncate(&self, model: &ModelDefinition) -> Result<(), StoreError> {
        let layout = TableLayout::of(model);
        let tree = self.table(&layout)?;
        tree.clear()?;
        self.db
            .open_tree(SEQUENCES_TREE)?
            .remove(layout.name.as_bytes())?;
        Ok(())
    }

    async fn insert(&self, model: &ModelDefinition, mut values: Row) -> Result<Row, StoreError> {
        let layout = TableLayout::of(model);
        let tree = self.table(&layout)?;
        let sequences = self.db.open_tree(SEQUENCES_TREE)?;

        blocking(move || {
            if let Some(column) = &layout.auto_increment {
                let explicit = values.get(column).and_then(Value::as_i64);
                let next = sequences.update_and_fetch(layout.name.as_bytes(), |current| {
                    let last = current
                        .and_then(|b| <[u8; 8]>::try_from(b).ok())
                        .map(i64::from_be_bytes)
                        .unwrap_or(0);
                    let next = match explicit {
                        Some(id) => last.max(id),
                        None => last.saturating_add(1),
                    };
                    Some(next.to_be_bytes().to_vec())
                })?;
                if explicit.is_none() {
                    let id = next
                        .and_then(|b| <[u8; 8]>::try_from(b.as_ref()).ok())
                        .map(i64::from_be_bytes)
                        .ok_or_else(|| StoreError::Backend("sequence update failed".to_string()))?;
                    values.insert(column.clone(), Value::from(id));
                }
            }

            let key = layout.key(&values)?;
            let encoded = serde_json::to_vec(&values)?;
            if tree
                .compare_and_swap(key, None as Option<&[u8]>, Some(encoded))?
                .is_err()
            {
                return Err(StoreError::ConstraintViolation {
                    table: layout.name.clone(),
                    message: "duplicate primary key".to_string(),
                });
            }
            Ok(values)
        })
        .await
    }

    async fn update(
        &self,
        model: &ModelDefinition,
        criteria: &Criteria,
        values: Row,
    ) -> Result<u64, StoreError> {
        let layout = TableLayout::of(model);
        let tree = self.table(&layout)?;
        let criteria = criteria.clone();

        blocking(move || {
            let mut touched = 0;
            for (old_key, mut row) in scan(&tree, &criteria)? {
                for (column, value) in &values {
                    row.insert(column.clone(), value.clone());
                }
                let new_key = layout.key(&row)?;
                if new_key.as_slice() != &*old_key {
                    tree.remove(&old_key)?;
                }
                tree.insert(new_key, serde_json::to_vec(&row)?)?;
                touched += 1;
            }
            Ok(touched)
        })
        .await
    }

    async fn delete(
        &self,
        model: &ModelDefinition,
        criteria: &Criteria,
    ) -> Result<u64, StoreError> {
        let tree = self.table(&TableLayout::of(model))?;
        let criteria = criteria.clone();

        blocking(move || {
            let mut removed = 0;
            for (key, _) in scan(&tree, &criteria)? {
                tree.remove(key)?;
                removed += 1;
            }
            Ok(removed)
        })
        .await
    }
}
