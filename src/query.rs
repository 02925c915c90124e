//! Find options and include requests.
//!
//! An [`Include`] names an association by alias, by target model, or both. It is
//! resolved against the source model's registry at query-issuance time into a
//! [`ResolvedInclude`] that the query executor can follow.

use crate::association::Association;
use crate::error::ModelError;
use crate::schema::Schema;
use crate::types::{Criteria, ModelId, Value};

/// Anything that names a canonical model
pub trait ModelRef {
    fn model_id(&self) -> ModelId;
}

impl ModelRef for ModelId {
    fn model_id(&self) -> ModelId {
        *self
    }
}

/// Eager-load request for one association
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Include {
    pub model: Option<ModelId>,
    pub alias: Option<String>,
    pub criteria: Criteria,
    pub include: Vec<Include>,
}

impl Include {
    /// Include the single association targeting `model`
    pub fn model(model: &impl ModelRef) -> Self {
        Self {
            model: Some(model.model_id()),
            ..Self::default()
        }
    }

    /// Include by alias key, matched with its exact casing
    pub fn alias(alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::default()
        }
    }

    /// Include `model` under `alias`
    pub fn model_as(model: &impl ModelRef, alias: impl Into<String>) -> Self {
        Self {
            model: Some(model.model_id()),
            alias: Some(alias.into()),
            ..Self::default()
        }
    }

    /// Restrict the included rows; a limit caps each parent's collection
    pub fn filter(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Nested include on the target
    pub fn include(mut self, include: Include) -> Self {
        self.include.push(include);
        self
    }

    /// Resolve against `source`'s association registry
    pub fn resolve(&self, schema: &Schema, source: ModelId) -> Result<ResolvedInclude, ModelError> {
        let def = schema.try_model(source)?;
        let association = match (&self.alias, self.model) {
            (Some(alias), model) => {
                let association = def.association(alias).filter(|a| {
                    model.map_or(true, |m| a.target() == m)
                });
                association.ok_or_else(|| ModelError::UnresolvableInclude {
                    model: def.name().to_string(),
                    alias: alias.clone(),
                })?
            }
            (None, Some(model)) => {
                let target = schema.try_model(model)?.name().to_string();
                let mut candidates = def.associations().values().filter(|a| a.target() == model);
                match (candidates.next(), candidates.next()) {
                    (Some(association), None) => association,
                    (Some(_), Some(_)) => {
                        return Err(ModelError::AmbiguousInclude {
                            model: def.name().to_string(),
                            target,
                        })
                    }
                    (None, _) => {
                        return Err(ModelError::UnresolvableInclude {
                            model: def.name().to_string(),
                            alias: target,
                        })
                    }
                }
            }
            (None, None) => {
                return Err(ModelError::InvalidArguments {
                    method: "include".to_string(),
                    message: "an include needs a model or an alias".to_string(),
                })
            }
        };

        let nested = self
            .include
            .iter()
            .map(|inc| inc.resolve(schema, association.target()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedInclude {
            association: association.clone(),
            criteria: self.criteria.clone(),
            include: nested,
        })
    }
}

/// Include matched to a concrete association
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInclude {
    pub association: Association,
    pub criteria: Criteria,
    pub include: Vec<ResolvedInclude>,
}

impl ResolvedInclude {
    /// Key the loaded rows are attached under
    pub fn key(&self) -> &str {
        self.association.key()
    }
}

/// Options for `find` / `find_all`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub criteria: Criteria,
    pub include: Vec<Include>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match on a single column value
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria = self.criteria.eq(column, value);
        self
    }

    pub fn filter(mut self, criteria: Criteria) -> Self {
        self.criteria = self.criteria.and(criteria);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.criteria.limit = Some(n);
        self
    }

    pub fn include(mut self, include: Include) -> Self {
        self.include.push(include);
        self
    }
}
