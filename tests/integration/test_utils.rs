//! Shared fixtures for integration tests

use ctxmodel::store::MemoryStore;
use ctxmodel::{Attribute, Context, Database, Instance, Schema};
use std::sync::Arc;

/// Context payload used across the tests
#[derive(Debug, PartialEq, Eq)]
pub struct Ctx(pub &'static str);

pub fn ctx(value: &'static str) -> Context {
    Context::new(Ctx(value))
}

/// Context value carried by a record
pub fn ctx_value(instance: &Instance) -> Option<&'static str> {
    instance
        .ctx()
        .and_then(|c| c.downcast_ref::<Ctx>())
        .map(|c| c.0)
}

pub fn no_attributes() -> Vec<(&'static str, Attribute)> {
    Vec::new()
}

/// Synced in-memory database plus a handle on its store for row inspection
pub async fn memory_db(schema: Schema) -> (Database, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let db = Database::new(schema, store.clone());
    db.sync().await.unwrap();
    (db, store)
}

pub fn ids(instances: &[Instance]) -> Vec<i64> {
    let mut ids: Vec<i64> = instances
        .iter()
        .filter_map(|i| i.id().and_then(|v| v.as_i64()))
        .collect();
    ids.sort_unstable();
    ids
}
