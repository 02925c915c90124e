//! Record instances.
//!
//! An [`Instance`] owns its row values and the binding that produced it. The
//! binding's context is fixed at construction and there is no way to replace it.

use super::accessor::{AccessorArgs, AccessorOutput, BoundAssociation};
use super::{Binding, BoundModel, Context};
use crate::database::Model;
use crate::error::ModelError;
use crate::query::ModelRef;
use crate::schema::ModelDefinition;
use crate::types::{Criteria, ModelId, Row, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Eager-loaded association value attached to an instance
#[derive(Debug, Clone)]
pub enum Included {
    One(Option<Box<Instance>>),
    Many(Vec<Instance>),
}

/// In-memory row bound to the context of the model that produced it
#[derive(Clone)]
pub struct Instance {
    pub(super) binding: Binding,
    pub(super) values: Row,
    pub(super) included: BTreeMap<String, Included>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("model", &self.definition().name())
            .field("context", &self.binding.context())
            .field("values", &self.values)
            .field("included", &self.included)
            .finish()
    }
}

impl ModelRef for Instance {
    fn model_id(&self) -> ModelId {
        self.binding.model_id()
    }
}

impl Instance {
    pub(super) fn new(binding: Binding, values: Row) -> Self {
        Self {
            binding,
            values,
            included: BTreeMap::new(),
        }
    }

    /// Context this record was bound under, if any
    pub fn ctx(&self) -> Option<&Context> {
        self.binding.context()
    }

    pub fn definition(&self) -> &ModelDefinition {
        self.binding.definition()
    }

    /// Canonical model of this record
    pub fn model(&self) -> Model {
        self.binding.db().handle(self.binding.model_id())
    }

    /// The bound view that produced this record
    pub fn bound_model(&self) -> Option<BoundModel> {
        self.binding
            .context()
            .map(|ctx| BoundModel::new(self.binding.clone(), ctx.clone()))
    }

    pub fn values(&self) -> &Row {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Primary key value (first key column)
    pub fn id(&self) -> Option<&Value> {
        self.definition()
            .primary_key()
            .and_then(|key| self.values.get(key))
            .filter(|value| !value.is_null())
    }

    /// Change a value locally; call [`Instance::save`] to persist it
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Criteria selecting exactly this row
    pub(crate) fn identity(&self) -> Result<Criteria, ModelError> {
        let def = self.definition();
        let keys = def.primary_keys();
        if keys.is_empty() {
            return Err(ModelError::MissingPrimaryKey(def.name().to_string()));
        }
        let mut criteria = Criteria::new();
        for key in keys {
            match self.values.get(key) {
                Some(value) if !value.is_null() => criteria = criteria.eq(key, value.clone()),
                _ => return Err(ModelError::MissingPrimaryKey(def.name().to_string())),
            }
        }
        Ok(criteria)
    }

    /// Persist the current values
    pub async fn save(&mut self) -> Result<(), ModelError> {
        let criteria = self.identity()?;
        let values = self.definition().retain_known(self.values.clone());
        self.binding.update_where(criteria, values).await?;
        Ok(())
    }

    /// Fresh copy of this row from the store, bound to the same context
    pub async fn reload(&self) -> Result<Option<Instance>, ModelError> {
        let criteria = self.identity()?.limit(1);
        Ok(self.binding.select(criteria).await?.into_iter().next())
    }

    /// Eager-loaded association by alias key
    pub fn included(&self, alias: &str) -> Option<&Included> {
        self.included.get(alias)
    }

    pub fn included_one(&self, alias: &str) -> Option<&Instance> {
        match self.included.get(alias) {
            Some(Included::One(Some(instance))) => Some(&**instance),
            _ => None,
        }
    }

    pub fn included_many(&self, alias: &str) -> Option<&[Instance]> {
        match self.included.get(alias) {
            Some(Included::Many(instances)) => Some(instances.as_slice()),
            _ => None,
        }
    }

    /// Whether the generated method table has `method`
    pub fn has_method(&self, method: &str) -> bool {
        self.definition().accessor(method).is_some()
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.definition()
            .accessors()
            .keys()
            .map(String::as_str)
            .collect()
    }

    /// Accessor handle for the association registered under `alias`
    pub fn association(&self, alias: &str) -> Result<BoundAssociation<'_>, ModelError> {
        let def = self.definition();
        let association = def
            .association(alias)
            .ok_or_else(|| ModelError::UnknownAssociation {
                model: def.name().to_string(),
                alias: alias.to_string(),
            })?;
        Ok(BoundAssociation::new(self, association))
    }

    /// Invoke a generated accessor by name, e.g. `getAssignments`
    pub async fn call(
        &self,
        method: &str,
        args: AccessorArgs,
    ) -> Result<AccessorOutput, ModelError> {
        let def = self.definition();
        let entry = def
            .accessor(method)
            .ok_or_else(|| ModelError::UnknownAccessor {
                model: def.name().to_string(),
                method: method.to_string(),
            })?;
        self.association(&entry.association)?
            .invoke(method, entry.kind, args)
            .await
    }
}
