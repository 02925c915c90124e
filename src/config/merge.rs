//! Merge rules: defaults and override order.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("define.timestamps", true)?
        .set_default("define.underscored", false)?
        .set_default("define.freeze_table_name", false)?
        .set_default("storage.backend", "memory")?
        .set_default("storage.path", ".ctxmodel/store")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")
}
