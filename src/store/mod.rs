//! Storage collaborators
//!
//! The core never builds queries itself. It hands criteria objects and resolved
//! include specs to a [`QueryExecutor`] and attribute values to a
//! [`Persistence`] layer, and gets plain rows or a plain result tree back.

pub mod memory;
pub mod persistence;

pub use memory::MemoryStore;
pub use persistence::SledStore;

use crate::association::AssociationKind;
use crate::error::StoreError;
use crate::query::ResolvedInclude;
use crate::schema::{ModelDefinition, Schema};
use crate::types::{Criteria, Row, Value};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;

/// Plain result-tree node: a row plus eager-loaded children keyed by alias
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawNode {
    pub row: Row,
    pub included: BTreeMap<String, RawIncluded>,
}

impl RawNode {
    pub fn new(row: Row) -> Self {
        Self {
            row,
            included: BTreeMap::new(),
        }
    }
}

/// Eager-loaded association value
#[derive(Debug, Clone, PartialEq)]
pub enum RawIncluded {
    One(Option<Box<RawNode>>),
    Many(Vec<RawNode>),
}

/// Query Executor interface
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Rows of `model` matching `criteria`
    async fn execute(
        &self,
        model: &ModelDefinition,
        criteria: &Criteria,
    ) -> Result<Vec<Row>, StoreError>;

    /// Rows of `model` with the requested associations attached.
    ///
    /// The default implementation issues one `execute` per include level and
    /// stitches the tree together by key.
    async fn execute_with_includes(
        &self,
        schema: &Schema,
        model: &ModelDefinition,
        criteria: &Criteria,
        includes: &[ResolvedInclude],
    ) -> Result<Vec<RawNode>, StoreError> {
        let rows = self.execute(model, criteria).await?;
        let mut nodes: Vec<RawNode> = rows.into_iter().map(RawNode::new).collect();
        for include in includes {
            load_include(self, schema, &mut nodes, include).await?;
        }
        Ok(nodes)
    }
}

/// Persistence Layer interface
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Create the backing table (stands in for the DDL engine)
    async fn register(&self, model: &ModelDefinition) -> Result<(), StoreError>;

    /// Drop every row of the model's table
    async fn truncate(&self, model: &ModelDefinition) -> Result<(), StoreError>;

    /// Insert a row and return it as persisted (generated keys filled in)
    async fn insert(&self, model: &ModelDefinition, values: Row) -> Result<Row, StoreError>;

    /// Merge `values` into every matching row; returns the number of rows touched
    async fn update(
        &self,
        model: &ModelDefinition,
        criteria: &Criteria,
        values: Row,
    ) -> Result<u64, StoreError>;

    /// Delete matching rows; returns the number removed
    async fn delete(&self, model: &ModelDefinition, criteria: &Criteria)
        -> Result<u64, StoreError>;
}

/// Combined backend handle
pub trait Store: QueryExecutor + Persistence {}

impl<T: QueryExecutor + Persistence> Store for T {}

fn key_values(nodes: &[RawNode], column: &str) -> Vec<Value> {
    let mut values: Vec<Value> = Vec::new();
    for node in nodes {
        if let Some(value) = node.row.get(column) {
            if !value.is_null() && !values.contains(value) {
                values.push(value.clone());
            }
        }
    }
    values
}

fn column_value<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

/// Load one include level for `parents`, then recurse into its nested includes.
fn load_include<'a, E>(
    executor: &'a E,
    schema: &'a Schema,
    parents: &'a mut [RawNode],
    include: &'a ResolvedInclude,
) -> BoxFuture<'a, Result<(), StoreError>>
where
    E: QueryExecutor + ?Sized,
{
    async move {
        let association = &include.association;
        let target = schema.model(association.target());
        let key = include.key().to_string();
        // An include limit caps each parent's collection, not the combined fetch
        let per_parent = include.criteria.limit.unwrap_or(usize::MAX);
        let filter = Criteria {
            limit: None,
            ..include.criteria.clone()
        };

        match association.kind() {
            AssociationKind::HasMany => {
                let ids = key_values(parents, association.source_key());
                let mut children = if ids.is_empty() {
                    Vec::new()
                } else {
                    let criteria = filter
                        .clone()
                        .and(Criteria::new().is_in(association.foreign_key(), ids));
                    fetch(executor, schema, target, &criteria, &include.include).await?
                };
                children.retain(|c| !column_value(&c.row, association.foreign_key()).is_null());
                for parent in parents.iter_mut() {
                    let id = column_value(&parent.row, association.source_key());
                    let matching = children
                        .iter()
                        .filter(|c| !id.is_null() && column_value(&c.row, association.foreign_key()) == id)
                        .take(per_parent)
                        .cloned()
                        .collect();
                    parent.included.insert(key.clone(), RawIncluded::Many(matching));
                }
            }
            AssociationKind::BelongsTo => {
                let ids = key_values(parents, association.foreign_key());
                let targets = if ids.is_empty() {
                    Vec::new()
                } else {
                    let criteria = filter
                        .clone()
                        .and(Criteria::new().is_in(association.target_key(), ids));
                    fetch(executor, schema, target, &criteria, &include.include).await?
                };
                for parent in parents.iter_mut() {
                    let fk = column_value(&parent.row, association.foreign_key());
                    let found = targets
                        .iter()
                        .find(|t| !fk.is_null() && column_value(&t.row, association.target_key()) == fk)
                        .cloned()
                        .map(Box::new);
                    parent.included.insert(key.clone(), RawIncluded::One(found));
                }
            }
            AssociationKind::BelongsToMany => {
                let junction = association.junction().ok_or_else(|| {
                    StoreError::Backend(format!("association {} has no junction", key))
                })?;
                let junction_def = schema.model(junction.model);
                let ids = key_values(parents, association.source_key());
                let links = if ids.is_empty() {
                    Vec::new()
                } else {
                    executor
                        .execute(
                            junction_def,
                            &Criteria::new().is_in(junction.foreign_key.clone(), ids),
                        )
                        .await?
                };
                let other_ids = {
                    let mut values: Vec<Value> = Vec::new();
                    for link in &links {
                        let value = column_value(link, &junction.other_key);
                        if !value.is_null() && !values.contains(value) {
                            values.push(value.clone());
                        }
                    }
                    values
                };
                let targets = if other_ids.is_empty() {
                    Vec::new()
                } else {
                    let criteria = filter
                        .clone()
                        .and(Criteria::new().is_in(association.target_key(), other_ids));
                    fetch(executor, schema, target, &criteria, &include.include).await?
                };
                for parent in parents.iter_mut() {
                    let id = column_value(&parent.row, association.source_key());
                    let linked: Vec<&Value> = links
                        .iter()
                        .filter(|l| !id.is_null() && column_value(l, &junction.foreign_key) == id)
                        .map(|l| column_value(l, &junction.other_key))
                        .collect();
                    let matching = targets
                        .iter()
                        .filter(|t| linked.contains(&column_value(&t.row, association.target_key())))
                        .take(per_parent)
                        .cloned()
                        .collect();
                    parent.included.insert(key.clone(), RawIncluded::Many(matching));
                }
            }
        }
        Ok(())
    }
    .boxed()
}

async fn fetch<E>(
    executor: &E,
    schema: &Schema,
    model: &ModelDefinition,
    criteria: &Criteria,
    nested: &[ResolvedInclude],
) -> Result<Vec<RawNode>, StoreError>
where
    E: QueryExecutor + ?Sized,
{
    let rows = executor.execute(model, criteria).await?;
    let mut nodes: Vec<RawNode> = rows.into_iter().map(RawNode::new).collect();
    for include in nested {
        load_include(executor, schema, &mut nodes, include).await?;
    }
    Ok(nodes)
}
