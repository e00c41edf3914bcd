//! ConfigLoader: composes defaults, config file and environment.

use super::paths;
use super::NotebookStoreConfig;
use crate::error::ApiError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use std::path::Path;

/// Environment prefix; nested keys use `__`, e.g. `NOTEBOOK_STORE__STORAGE__CACHE_SIZE`
pub const ENV_PREFIX: &str = "NOTEBOOK_STORE";

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration.
    ///
    /// Precedence: defaults (lowest) -> config file -> environment (highest).
    /// An explicit `path` must exist; the default XDG config file is optional.
    pub fn load(path: Option<&Path>) -> Result<NotebookStoreConfig, ApiError> {
        let builder = Config::builder();
        let builder = match path {
            Some(path) => add_file(builder, path, true),
            None => match paths::default_config_file() {
                Ok(default_path) => add_file(builder, &default_path, false),
                Err(_) => builder,
            },
        };
        let config: NotebookStoreConfig = add_environment(builder).build()?.try_deserialize()?;
        config.storage.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<NotebookStoreConfig, ApiError> {
        Self::load(Some(path))
    }

    /// Create default configuration.
    pub fn default() -> NotebookStoreConfig {
        NotebookStoreConfig::default()
    }
}

fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).required(required))
}

fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    )
}
