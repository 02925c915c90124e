//! Canonical model definitions
//!
//! A [`SchemaBuilder`] collects model definitions and association declarations
//! synchronously; [`SchemaBuilder::build`] freezes them into a [`Schema`] that is
//! shared read-only by every bound model and instance.

use crate::association::{AccessorEntry, Association};
use crate::config::DefineDefaults;
use crate::error::ModelError;
use crate::naming::{self, EnglishInflection, Inflection, NameForms};
use crate::types::{ModelId, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    String,
    Text,
    Boolean,
    Date,
    Json,
}

/// Reference from a foreign key column to another table's key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub table: String,
    pub key: String,
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub data_type: DataType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub allow_null: bool,
    pub references: Option<Reference>,
}

impl Attribute {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            primary_key: false,
            auto_increment: false,
            allow_null: true,
            references: None,
        }
    }

    pub fn integer() -> Self {
        Self::new(DataType::Integer)
    }

    pub fn string() -> Self {
        Self::new(DataType::String)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_null = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn references(mut self, table: impl Into<String>, key: impl Into<String>) -> Self {
        self.references = Some(Reference {
            table: table.into(),
            key: key.into(),
        });
        self
    }
}

/// Per-model definition options; unset fields fall back to [`DefineDefaults`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub table_name: Option<String>,
    pub freeze_table_name: Option<bool>,
    pub timestamps: Option<bool>,
    pub underscored: Option<bool>,
    pub name: Option<NameForms>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn freeze_table_name(mut self, freeze: bool) -> Self {
        self.freeze_table_name = Some(freeze);
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    pub fn underscored(mut self, underscored: bool) -> Self {
        self.underscored = Some(underscored);
        self
    }

    pub fn name(mut self, forms: NameForms) -> Self {
        self.name = Some(forms);
        self
    }
}

/// Canonical model: schema plus association registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    pub(crate) id: ModelId,
    pub(crate) name: String,
    pub(crate) table_name: String,
    pub(crate) name_forms: NameForms,
    pub(crate) attributes: BTreeMap<String, Attribute>,
    pub(crate) timestamps: bool,
    pub(crate) underscored: bool,
    pub(crate) associations: BTreeMap<String, Association>,
    pub(crate) accessors: BTreeMap<String, AccessorEntry>,
}

impl ModelDefinition {
    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn name_forms(&self) -> &NameForms {
        &self.name_forms
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn underscored(&self) -> bool {
        self.underscored
    }

    /// Primary key columns, in attribute order
    pub fn primary_keys(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.primary_key)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// First primary key column (the referenced key for associations)
    pub fn primary_key(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(_, attr)| attr.primary_key)
            .map(|(name, _)| name.as_str())
    }

    pub fn auto_increment_column(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(_, attr)| attr.auto_increment)
            .map(|(name, _)| name.as_str())
    }

    pub fn timestamp_columns(&self) -> Option<(String, String)> {
        self.timestamps
            .then(|| naming::timestamp_columns(self.underscored))
    }

    /// Association registry keyed by alias
    pub fn associations(&self) -> &BTreeMap<String, Association> {
        &self.associations
    }

    pub fn association(&self, alias: &str) -> Option<&Association> {
        self.associations.get(alias)
    }

    /// Generated accessor method table
    pub fn accessors(&self) -> &BTreeMap<String, AccessorEntry> {
        &self.accessors
    }

    pub fn accessor(&self, method: &str) -> Option<&AccessorEntry> {
        self.accessors.get(method)
    }

    /// Keep only known columns
    pub(crate) fn retain_known(&self, values: Row) -> Row {
        values
            .into_iter()
            .filter(|(column, _)| self.attributes.contains_key(column))
            .collect()
    }
}

/// Frozen set of canonical models
pub struct Schema {
    models: Vec<ModelDefinition>,
    by_name: HashMap<String, ModelId>,
    inflection: Arc<dyn Inflection>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("models", &self.models.iter().map(|m| &m.name).collect::<Vec<_>>())
            .finish()
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn models(&self) -> &[ModelDefinition] {
        &self.models
    }

    /// Definition for an id issued by this schema.
    ///
    /// Ids are only meaningful in the schema that issued them. Panics on an id
    /// past the end; use [`Schema::try_model`] for ids from outside.
    pub fn model(&self, id: ModelId) -> &ModelDefinition {
        &self.models[id.0]
    }

    pub fn try_model(&self, id: ModelId) -> Result<&ModelDefinition, ModelError> {
        self.models
            .get(id.0)
            .ok_or_else(|| ModelError::UnknownModel(format!("{:?}", id)))
    }

    pub fn model_id(&self, name: &str) -> Option<ModelId> {
        self.by_name.get(name).copied()
    }

    pub fn model_by_name(&self, name: &str) -> Result<&ModelDefinition, ModelError> {
        self.model_id(name)
            .map(|id| self.model(id))
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn inflection(&self) -> &dyn Inflection {
        self.inflection.as_ref()
    }
}

/// Mutable schema under construction
pub struct SchemaBuilder {
    pub(crate) models: Vec<ModelDefinition>,
    pub(crate) by_name: HashMap<String, ModelId>,
    pub(crate) inflection: Arc<dyn Inflection>,
    pub(crate) defaults: DefineDefaults,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            by_name: HashMap::new(),
            inflection: Arc::new(EnglishInflection),
            defaults: DefineDefaults::default(),
        }
    }

    /// Use a different inflection collaborator
    pub fn with_inflection(mut self, inflection: Arc<dyn Inflection>) -> Self {
        self.inflection = inflection;
        self
    }

    /// Apply definition defaults from configuration
    pub fn with_defaults(mut self, defaults: DefineDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Define a canonical model.
    ///
    /// Adds an auto-increment `id` primary key when no attribute is a primary key,
    /// and timestamp columns unless disabled.
    pub fn define<K, I>(
        &mut self,
        name: &str,
        attributes: I,
        options: ModelOptions,
    ) -> Result<ModelId, ModelError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Attribute)>,
    {
        if self.by_name.contains_key(name) {
            return Err(ModelError::InvalidDefinition(format!(
                "model '{}' is already defined",
                name
            )));
        }

        let timestamps = options.timestamps.unwrap_or(self.defaults.timestamps);
        let underscored = options.underscored.unwrap_or(self.defaults.underscored);
        let freeze = options
            .freeze_table_name
            .unwrap_or(self.defaults.freeze_table_name);
        let table_name = options
            .table_name
            .unwrap_or_else(|| naming::table_name(name, freeze, self.inflection.as_ref()));
        let name_forms = options
            .name
            .unwrap_or_else(|| NameForms::infer(name, self.inflection.as_ref()));

        let mut attributes: BTreeMap<String, Attribute> = attributes
            .into_iter()
            .map(|(k, attr)| (k.into(), attr))
            .collect();
        if !attributes.values().any(|attr| attr.primary_key) {
            attributes.insert(
                "id".to_string(),
                Attribute::integer().primary_key().auto_increment(),
            );
        }

        Ok(self.insert_model(
            name.to_string(),
            table_name,
            name_forms,
            attributes,
            timestamps,
            underscored,
        ))
    }

    pub(crate) fn insert_model(
        &mut self,
        name: String,
        table_name: String,
        name_forms: NameForms,
        mut attributes: BTreeMap<String, Attribute>,
        timestamps: bool,
        underscored: bool,
    ) -> ModelId {
        if timestamps {
            let (created, updated) = naming::timestamp_columns(underscored);
            attributes
                .entry(created)
                .or_insert_with(|| Attribute::new(DataType::Date).not_null());
            attributes
                .entry(updated)
                .or_insert_with(|| Attribute::new(DataType::Date).not_null());
        }

        let id = ModelId(self.models.len());
        debug!(
            model = %name,
            table = %table_name,
            attributes = attributes.len(),
            "Defined model"
        );
        self.by_name.insert(name.clone(), id);
        self.models.push(ModelDefinition {
            id,
            name,
            table_name,
            name_forms,
            attributes,
            timestamps,
            underscored,
            associations: BTreeMap::new(),
            accessors: BTreeMap::new(),
        });
        id
    }

    /// Definition for an id issued by this builder; panics on an id past the end
    pub fn model(&self, id: ModelId) -> &ModelDefinition {
        &self.models[id.0]
    }

    pub fn try_model(&self, id: ModelId) -> Result<&ModelDefinition, ModelError> {
        self.models
            .get(id.0)
            .ok_or_else(|| ModelError::UnknownModel(format!("{:?}", id)))
    }

    pub fn model_id(&self, name: &str) -> Option<ModelId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn model_mut(&mut self, id: ModelId) -> &mut ModelDefinition {
        &mut self.models[id.0]
    }

    /// Freeze the schema
    pub fn build(self) -> Schema {
        debug!(models = self.models.len(), "Schema frozen");
        Schema {
            models: self.models,
            by_name: self.by_name,
            inflection: self.inflection,
        }
    }
}
