//! Error types for the context-bound model layer.

use thiserror::Error;

/// Storage-related errors raised by the query and persistence collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Table not registered: {0}. Run `Database::sync` first.")]
    UnknownTable(String),

    #[error("Constraint violation on {table}: {message}")]
    ConstraintViolation { table: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors surfaced by model declaration, binding and accessor calls
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Alias '{alias}' is already used by an association on {model}")]
    DuplicateAlias { model: String, alias: String },

    #[error("Accessor '{method}' already exists on {model}")]
    DuplicateAccessor { model: String, method: String },

    #[error("{alias} is not associated to {model}")]
    UnresolvableInclude { model: String, alias: String },

    #[error("{target} is associated to {model} more than once; include it with an alias")]
    AmbiguousInclude { model: String, target: String },

    #[error("Record bound to a different context passed to {model}.{alias}")]
    ContextMismatch { model: String, alias: String },

    #[error("Model not defined: {0}")]
    UnknownModel(String),

    #[error("Model {model} has no association '{alias}'")]
    UnknownAssociation { model: String, alias: String },

    #[error("Model {model} has no accessor '{method}'")]
    UnknownAccessor { model: String, method: String },

    #[error("Invalid arguments for {method}: {message}")]
    InvalidArguments { method: String, message: String },

    #[error("Model {0} has no primary key value")]
    MissingPrimaryKey(String),

    #[error("Invalid model definition: {0}")]
    InvalidDefinition(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for ModelError {
    fn from(err: config::ConfigError) -> Self {
        ModelError::Config(err.to_string())
    }
}
