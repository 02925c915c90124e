//! Configuration System
//!
//! Layered configuration for definition defaults, the storage backend and
//! logging. Sources are merged in order: built-in defaults, `ctxmodel.toml` in the
//! project root, `ctxmodel.{CTXMODEL_ENV}.toml`, then `CTXMODEL_*` environment
//! variables (`CTXMODEL_DEFINE__UNDERSCORED=true`).

use crate::error::ModelError;
use crate::logging::LoggingConfig;
use crate::schema::SchemaBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge;
mod sources;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CtxModelConfig {
    /// Defaults applied to every model definition
    #[serde(default)]
    pub define: DefineDefaults,

    /// Storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults for `SchemaBuilder::define` options left unset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineDefaults {
    #[serde(default = "default_true")]
    pub timestamps: bool,

    #[serde(default)]
    pub underscored: bool,

    #[serde(default)]
    pub freeze_table_name: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DefineDefaults {
    fn default() -> Self {
        Self {
            timestamps: true,
            underscored: false,
            freeze_table_name: false,
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database directory (sled backend only)
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".ctxmodel/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

impl CtxModelConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.storage.backend == StorageBackend::Sled && self.storage.path.as_os_str().is_empty()
        {
            errors.push(ValidationError::Storage(
                "Store path cannot be empty for the sled backend".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::Logging(format!(
                "Invalid level '{}'",
                self.logging.level
            )));
        }
        if self.logging.format != "json" && self.logging.format != "text" {
            errors.push(ValidationError::Logging(format!(
                "Invalid format '{}' (must be 'json' or 'text')",
                self.logging.format
            )));
        }
        if self.logging.output != "stdout" && self.logging.output != "stderr" {
            errors.push(ValidationError::Logging(format!(
                "Invalid output '{}' (must be 'stdout' or 'stderr')",
                self.logging.output
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Schema builder carrying the configured definition defaults
    pub fn schema_builder(&self) -> SchemaBuilder {
        SchemaBuilder::new().with_defaults(self.define.clone())
    }
}

/// Loads [`CtxModelConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a project rooted at `root`, then validate it
    pub fn load(root: &Path) -> Result<CtxModelConfig, ModelError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::add_project_files(builder, root)?;
        let builder = sources::add_environment(builder);
        Self::finish(builder)
    }

    /// Load a single file on top of the defaults (no environment overrides)
    pub fn load_from_file(path: &Path) -> Result<CtxModelConfig, ModelError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::add_file(builder, path, true);
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<CtxModelConfig, ModelError> {
        let config: CtxModelConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ModelError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(config)
    }
}
