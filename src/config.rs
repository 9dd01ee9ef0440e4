//! Configuration System
//!
//! Layered configuration built with the `config` crate. Sources, lowest
//! precedence first: built-in defaults, the user file
//! (`$XDG_CONFIG_HOME/laminate/config.toml`), the project file
//! (`<root>/laminate.toml`), then `LAMINATE__*` environment variables.

use crate::error::ConfigError;
use crate::index::VariantFallbackMap;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge;
mod sources;

pub use sources::global_file::global_config_path;
pub use sources::project_file::{project_config_path, PROJECT_CONFIG_FILE};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaminateConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings consumed by [`crate::cache::Cache`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Worker threads for batch prim indexing; 0 means one per CPU
    #[serde(default)]
    pub max_parallelism: usize,

    /// When false, property indexes are rebuilt on every request
    #[serde(default = "default_true")]
    pub cache_property_indexes: bool,

    /// Node capacity of a single prim index
    #[serde(default = "default_max_index_nodes")]
    pub max_index_nodes: usize,

    /// Initial variant fallback table
    #[serde(default)]
    pub variant_fallbacks: VariantFallbackMap,
}

fn default_true() -> bool {
    true
}

fn default_max_index_nodes() -> usize {
    65_535
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_parallelism: 0,
            cache_property_indexes: true,
            max_index_nodes: default_max_index_nodes(),
            variant_fallbacks: VariantFallbackMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_index_nodes == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_index_nodes must be at least 1".to_string(),
            ));
        }
        for (set, candidates) in &self.variant_fallbacks {
            if set.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "variant fallback set names cannot be empty".to_string(),
                ));
            }
            if candidates.iter().any(|c| c.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "variant fallback candidates for '{}' cannot be empty",
                    set
                )));
            }
        }
        Ok(())
    }
}

impl LaminateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()
    }
}

/// Loads [`LaminateConfig`] from every configured source
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    project_root: Option<PathBuf>,
    user_file: bool,
    environment: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            project_root: None,
            user_file: true,
            environment: true,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `<root>/laminate.toml` as well
    pub fn with_project_root(mut self, root: impl AsRef<Path>) -> Self {
        self.project_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Skip the user config file
    pub fn without_user_file(mut self) -> Self {
        self.user_file = false;
        self
    }

    /// Skip `LAMINATE__*` environment variables
    pub fn without_environment(mut self) -> Self {
        self.environment = false;
        self
    }

    pub fn load(&self) -> Result<LaminateConfig, ConfigError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        if self.user_file {
            builder = sources::global_file::add_to_builder(builder);
        }
        if let Some(root) = &self.project_root {
            builder = sources::project_file::add_to_builder(builder, root);
        }
        if self.environment {
            builder = sources::environment::add_to_builder(builder);
        }

        let config: LaminateConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
