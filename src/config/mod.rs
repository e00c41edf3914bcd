//! Configuration
//!
//! Layered configuration for the store: serde defaults, then an optional TOML
//! file, then `NOTEBOOK_STORE__<SECTION>__<KEY>` environment variables.

pub mod loader;
pub mod paths;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::StoreSettings;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotebookStoreConfig {
    #[serde(default)]
    pub storage: StoreSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}
