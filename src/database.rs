//! Database handle and canonical model handles.
//!
//! A [`Database`] pairs a frozen [`Schema`] with a storage backend. Both are held
//! behind `Arc`, so handles are cheap to clone and share across tasks.

use crate::config::{CtxModelConfig, StorageBackend};
use crate::context::{Binding, BoundModel, Context, Instance};
use crate::error::ModelError;
use crate::query::{FindOptions, ModelRef};
use crate::schema::{ModelDefinition, Schema};
use crate::store::{MemoryStore, SledStore, Store};
use crate::types::{ModelId, Row};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Frozen schema plus storage backend
#[derive(Clone)]
pub struct Database {
    schema: Arc<Schema>,
    store: Arc<dyn Store>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn new(schema: Schema, store: Arc<dyn Store>) -> Self {
        Self {
            schema: Arc::new(schema),
            store,
        }
    }

    /// Database over a fresh in-memory store
    pub fn in_memory(schema: Schema) -> Self {
        Self::new(schema, Arc::new(MemoryStore::new()))
    }

    /// Open the backend named by the storage configuration
    pub fn from_config(schema: Schema, config: &CtxModelConfig) -> Result<Self, ModelError> {
        let store: Arc<dyn Store> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Sled => Arc::new(SledStore::new(&config.storage.path)?),
        };
        debug!(backend = ?config.storage.backend, "Opened storage backend");
        Ok(Self::new(schema, store))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn definition(&self, id: ModelId) -> &ModelDefinition {
        self.schema.model(id)
    }

    /// Canonical model handle by name
    pub fn model(&self, name: &str) -> Result<Model, ModelError> {
        let id = self
            .schema
            .model_id(name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))?;
        Ok(self.handle(id))
    }

    /// Canonical model handle by id; ids from another schema are rejected
    pub fn model_by_id(&self, id: ModelId) -> Result<Model, ModelError> {
        self.schema.try_model(id)?;
        Ok(self.handle(id))
    }

    pub(crate) fn handle(&self, id: ModelId) -> Model {
        Model {
            binding: Binding::new(self.clone(), id, None),
        }
    }

    /// Register every table with the backend
    pub async fn sync(&self) -> Result<(), ModelError> {
        for model in self.schema.models() {
            self.store.register(model).await?;
        }
        debug!(models = self.schema.models().len(), "Synced tables");
        Ok(())
    }

    /// Remove all rows from one model's table
    pub async fn truncate(&self, model: &impl ModelRef) -> Result<(), ModelError> {
        let def = self.schema.try_model(model.model_id())?;
        self.store.truncate(def).await?;
        Ok(())
    }
}

/// Canonical (unbound) model handle
#[derive(Clone, Debug)]
pub struct Model {
    binding: Binding,
}

impl ModelRef for Model {
    fn model_id(&self) -> ModelId {
        self.binding.model_id()
    }
}

impl Model {
    pub fn id(&self) -> ModelId {
        self.binding.model_id()
    }

    pub fn definition(&self) -> &ModelDefinition {
        self.binding.definition()
    }

    pub fn name(&self) -> &str {
        self.definition().name()
    }

    /// Bind this model to `context`
    pub fn contextify(&self, context: Context) -> BoundModel {
        BoundModel::new(self.binding.clone(), context)
    }

    /// Create an unbound record
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
