//! ctxmodel: context-bound model views
//!
//! Models and their associations are declared once on a [`SchemaBuilder`].
//! `Model::contextify` then produces any number of [`BoundModel`] views over the
//! frozen schema. Records created or loaded through a view, records returned by
//! their association accessors, and every node of an eager-loaded tree all carry
//! the view's [`Context`].

pub mod association;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod logging;
pub mod naming;
pub mod query;
pub mod schema;
pub mod store;
pub mod types;

pub use association::{AccessorKind, Association, AssociationKind, AssociationOptions, Through};
pub use config::{ConfigLoader, CtxModelConfig, DefineDefaults, StorageBackend, StorageConfig};
pub use context::{
    AccessorArgs, AccessorOutput, BoundAssociation, BoundModel, Context, Included, Instance,
};
pub use database::{Database, Model};
pub use error::{ModelError, StoreError};
pub use naming::{Alias, NameForms};
pub use query::{FindOptions, Include, ModelRef};
pub use schema::{Attribute, DataType, ModelDefinition, ModelOptions, Schema, SchemaBuilder};
pub use types::{row, Criteria, ModelId, Row, Value};
