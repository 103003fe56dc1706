//! Service configuration.
//!
//! ```yaml
//! parseConfig:
//!   maxRecursionLevels: 1
//!   onlyRequired: false
//! cache:
//!   schema: true
//! contexts: [petstore, common]
//! contextAreaPrefix: in-
//! seed: 42
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::contexts::Contexts;
use crate::error::ConfigError;
use crate::replacer::{Pipeline, DEFAULT_AREA_PREFIX};
use crate::types::ParseConfig;

/// Per-service generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub parse_config: ParseConfig,
    pub cache: CacheConfig,
    /// Fixed seed for reproducible output.
    pub seed: Option<u64>,
    /// Context namespaces to search, in order.
    pub contexts: Vec<String>,
    pub context_area_prefix: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            parse_config: ParseConfig::default(),
            cache: CacheConfig::default(),
            seed: None,
            contexts: Vec::new(),
            context_area_prefix: DEFAULT_AREA_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache operation shapes instead of normalizing on every call.
    pub schema: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { schema: true }
    }
}

impl ServiceConfig {
    /// Parse a YAML config. An empty document gives the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Option<Self> =
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::InvalidYaml { source })?;
        Ok(config.unwrap_or_default())
    }

    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Build the replacer pipeline over the configured namespaces of
    /// `available`. With no namespaces configured, all of them are searched.
    pub fn pipeline(&self, available: &Contexts) -> Pipeline {
        let contexts = if self.contexts.is_empty() {
            available.clone()
        } else {
            available.select(&self.contexts)
        };

        let mut builder = Pipeline::builder()
            .contexts(contexts)
            .area_prefix(self.context_area_prefix.as_str());
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }
}
