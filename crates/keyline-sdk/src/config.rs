use std::path::Path;

use keyline_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Settings for one [`Sdk`](crate::Sdk) handle.
///
/// ```toml
/// prefix = "/apisix"
///
/// [store]
/// endpoints = ["127.0.0.1:2379"]
/// dial_timeout_ms = 3000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Root key prefix for every query derived from the handle.
    pub prefix: String,
    pub store: StoreConfig,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            prefix: "/keyline".to_string(),
            store: StoreConfig::default(),
        }
    }
}

impl SdkConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SdkResult<()> {
        self.store
            .validate()
            .map_err(|e| SdkError::Config(e.to_string()))
    }
}
