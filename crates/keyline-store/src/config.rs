use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Connection settings for a store cluster.
///
/// Two configurations that serialize identically share one connection in the
/// [`ConnectionRegistry`](crate::ConnectionRegistry).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub endpoints: Vec<String>,
    pub dial_timeout_ms: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Key namespace applied by the backend itself, if it supports one.
    pub namespace: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["127.0.0.1:2379".to_string()],
            dial_timeout_ms: 5_000,
            username: None,
            password: None,
            namespace: None,
        }
    }
}

impl StoreConfig {
    pub fn with_endpoints<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Deterministic identity of this configuration, used as the registry key.
    pub fn registry_key(&self) -> StoreResult<String> {
        serde_json::to_string(self).map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.endpoints.is_empty() {
            return Err(StoreError::InvalidConfig("no endpoints configured".into()));
        }
        if let Some(empty) = self.endpoints.iter().find(|e| e.trim().is_empty()) {
            return Err(StoreError::InvalidConfig(format!("blank endpoint {empty:?}")));
        }
        Ok(())
    }
}
