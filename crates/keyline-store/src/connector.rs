use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryKvStore;
use crate::traits::KvStore;

/// Opens new store connections.
///
/// The registry calls this only when no live connection exists for a
/// configuration, so implementations never need to deduplicate themselves.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &StoreConfig) -> StoreResult<Arc<dyn KvStore>>;
}

/// Connector that backs every connection with a fresh [`InMemoryKvStore`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryConnector;

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, config: &StoreConfig) -> StoreResult<Arc<dyn KvStore>> {
        config
            .validate()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Arc::new(InMemoryKvStore::new()))
    }
}
