//! Context Binder
//!
//! `contextify` wraps a canonical model and an opaque caller context into a
//! [`BoundModel`]. The context travels explicitly: every [`Binding`] carries it,
//! every record built from a binding stores it, and every related model reached
//! from a binding (accessor targets, include targets, junctions) is rebound with
//! the same value. Nothing is looked up from ambient state, so concurrent callers
//! sharing one canonical model never observe each other's context.

pub mod accessor;
pub mod eager;
pub mod instance;

pub use accessor::{AccessorArgs, AccessorOutput, BoundAssociation};
pub use instance::{Included, Instance};

use crate::association::Association;
use crate::database::{Database, Model};
use crate::error::ModelError;
use crate::query::{FindOptions, ModelRef};
use crate::schema::{Attribute, ModelDefinition};
use crate::types::{Criteria, ModelId, Row, Value};
use chrono::Utc;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Opaque caller-supplied context, compared by identity
#[derive(Clone)]
pub struct Context(Arc<dyn Any + Send + Sync>);

impl Context {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wrap a value the caller already shares
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Identity comparison: true only for clones of the same context
    pub fn same(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context({:p})", Arc::as_ptr(&self.0))
    }
}

/// (database, model, context) triple threaded through every operation
#[derive(Clone)]
pub(crate) struct Binding {
    db: Database,
    model: ModelId,
    context: Option<Context>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("model", &self.definition().name())
            .field("context", &self.context)
            .finish()
    }
}

impl Binding {
    pub(crate) fn new(db: Database, model: ModelId, context: Option<Context>) -> Self {
        Self { db, model, context }
    }

    pub(crate) fn model_id(&self) -> ModelId {
        self.model
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn definition(&self) -> &ModelDefinition {
        self.db.definition(self.model)
    }

    pub(crate) fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    pub(crate) fn with_context(&self, context: Option<Context>) -> Self {
        Self::new(self.db.clone(), self.model, context)
    }

    /// Same context, another model
    pub(crate) fn rebind(&self, model: ModelId) -> Self {
        Self::new(self.db.clone(), model, self.context.clone())
    }

    /// Wrap a persisted row as a record carrying this binding's context
    pub(crate) fn instance(&self, row: Row) -> Instance {
        Instance::new(self.clone(), row)
    }

    pub(crate) async fn create(&self, values: Row) -> Result<Instance, ModelError> {
        let def = self.definition();
        let mut values = def.retain_known(values);
        if let Some((created, updated)) = def.timestamp_columns() {
            let now = Value::from(Utc::now().to_rfc3339());
            values.entry(created).or_insert_with(|| now.clone());
            values.entry(updated).or_insert(now);
        }

        let row = self.db.store().insert(def, values).await?;
        trace!(model = %def.name(), bound = self.context.is_some(), "Created record");
        Ok(self.instance(row))
    }

    pub(crate) async fn find_all(&self, options: FindOptions) -> Result<Vec<Instance>, ModelError> {
        let def = self.definition();
        let schema = self.db.schema();
        let includes = options
            .include
            .iter()
            .map(|include| include.resolve(schema, self.model))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            model = %def.name(),
            conditions = options.criteria.conditions.len(),
            includes = includes.len(),
            bound = self.context.is_some(),
            "Issuing query"
        );

        if includes.is_empty() {
            return self.select(options.criteria).await;
        }
        let nodes = self
            .db
            .store()
            .execute_with_includes(schema, def, &options.criteria, &includes)
            .await?;
        Ok(eager::bind_nodes(self, nodes, &includes))
    }

    pub(crate) async fn find(&self, options: FindOptions) -> Result<Option<Instance>, ModelError> {
        let options = options.limit(1);
        Ok(self.find_all(options).await?.into_iter().next())
    }

    /// Plain select without includes
    pub(crate) async fn select(&self, criteria: Criteria) -> Result<Vec<Instance>, ModelError> {
        let rows = self.db.store().execute(self.definition(), &criteria).await?;
        Ok(rows.into_iter().map(|row| self.instance(row)).collect())
    }

    /// Update matching rows, refreshing the update timestamp
    pub(crate) async fn update_where(
        &self,
        criteria: Criteria,
        mut values: Row,
    ) -> Result<u64, ModelError> {
        let def = self.definition();
        if let Some((_, updated)) = def.timestamp_columns() {
            values.insert(updated, Value::from(Utc::now().to_rfc3339()));
        }
        Ok(self.db.store().update(def, &criteria, values).await?)
    }

    pub(crate) async fn delete_where(&self, criteria: Criteria) -> Result<u64, ModelError> {
        Ok(self.db.store().delete(self.definition(), &criteria).await?)
    }
}

/// A canonical model bound to one context
#[derive(Clone, Debug)]
pub struct BoundModel {
    binding: Binding,
    context: Context,
}

impl PartialEq for BoundModel {
    fn eq(&self, other: &Self) -> bool {
        self.binding.model == other.binding.model && self.context.same(&other.context)
    }
}

impl ModelRef for BoundModel {
    fn model_id(&self) -> ModelId {
        self.binding.model
    }
}

impl BoundModel {
    pub(crate) fn new(binding: Binding, context: Context) -> Self {
        let binding = binding.with_context(Some(context.clone()));
        Self { binding, context }
    }

    pub fn id(&self) -> ModelId {
        self.binding.model
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The canonical model this view delegates to
    pub fn canonical(&self) -> Model {
        self.binding.db.handle(self.binding.model)
    }

    pub fn definition(&self) -> &ModelDefinition {
        self.binding.definition()
    }

    pub fn name(&self) -> &str {
        self.definition().name()
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        self.definition().attributes()
    }

    pub fn associations(&self) -> &BTreeMap<String, Association> {
        self.definition().associations()
    }

    pub fn association(&self, alias: &str) -> Option<&Association> {
        self.definition().association(alias)
    }

    /// Bind another model to the same context
    pub fn sibling(&self, model: &impl ModelRef) -> Result<BoundModel, ModelError> {
        self.binding.db.schema().try_model(model.model_id())?;
        Ok(BoundModel::new(
            self.binding.rebind(model.model_id()),
            self.context.clone(),
        ))
    }

    /// Create a record carrying this view's context
    pub async fn create(&self, values: Row) -> Result<Instance, ModelError> {
        self.binding.create(values).await
    }

    pub async fn find(&self, options: FindOptions) -> Result<Option<Instance>, ModelError> {
        self.binding.find(options).await
    }

    pub async fn find_all(&self, options: FindOptions) -> Result<Vec<Instance>, ModelError> {
        self.binding.find_all(options).await
    }
}
