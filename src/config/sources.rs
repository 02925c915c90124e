//! Config sources: project files and `CTXMODEL_*` environment variables.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Add `ctxmodel.toml` then `ctxmodel.{CTXMODEL_ENV}.toml` from `root`, when present.
pub fn add_project_files(
    builder: ConfigBuilder<DefaultState>,
    root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder;

    let base = root.join("ctxmodel.toml");
    if base.exists() {
        builder = add_file(builder, &base, false);
    }

    if let Ok(env_name) = std::env::var("CTXMODEL_ENV") {
        let env_file = root.join(format!("ctxmodel.{}.toml", env_name));
        if env_file.exists() {
            builder = add_file(builder, &env_file, false);
        }
    }

    Ok(builder)
}

/// Add one TOML file source.
pub fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> ConfigBuilder<DefaultState> {
    debug!(config_path = %path.display(), "Adding config file");
    builder.add_source(
        File::from(path)
            .format(FileFormat::Toml)
            .required(required),
    )
}

/// Add `CTXMODEL_<SECTION>__<KEY>` environment overrides.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("CTXMODEL")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
