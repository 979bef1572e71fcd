//! Process-wide, reference-counted store connections.
//!
//! Connections are deduplicated by the serialized [`StoreConfig`]. The first
//! [`acquire`](ConnectionRegistry::acquire) for a configuration connects and
//! records a count of one; later acquires bump the count and hand back the
//! same connection. [`release`](ConnectionRegistry::release) decrements and
//! tears the connection down when the count reaches zero.
//!
//! One `tokio::sync::Mutex` covers every read-modify-write of the map,
//! including the connect call, so two concurrent acquires can never both
//! observe "absent", and a release can never close a connection an acquire
//! is about to return.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::connector::Connector;
use crate::error::StoreResult;
use crate::traits::KvStore;

static GLOBAL: LazyLock<ConnectionRegistry> = LazyLock::new(ConnectionRegistry::new);

struct Entry {
    store: Arc<dyn KvStore>,
    references: usize,
}

/// Reference-counted map from configuration to live connection.
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ConnectionRegistry {
    /// Create an empty, private registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry, empty until first use.
    pub fn global() -> &'static ConnectionRegistry {
        &GLOBAL
    }

    /// Return the shared connection for `config`, connecting if none is live.
    pub async fn acquire(
        &self,
        connector: &dyn Connector,
        config: &StoreConfig,
    ) -> StoreResult<Arc<dyn KvStore>> {
        let key = config.registry_key()?;
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(&key) {
            entry.references += 1;
            debug!(endpoints = ?config.endpoints, references = entry.references, "reusing store connection");
            return Ok(entry.store.clone());
        }

        let store = connector.connect(config).await?;
        info!(endpoints = ?config.endpoints, "opened store connection");
        entries.insert(
            key,
            Entry {
                store: store.clone(),
                references: 1,
            },
        );
        Ok(store)
    }

    /// Drop one reference to `store`, closing it when none remain.
    ///
    /// The connection is located by pointer identity. Releasing a connection
    /// the registry does not know is a no-op.
    pub async fn release(&self, store: &Arc<dyn KvStore>) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        let owner = entries
            .iter()
            .find(|(_, entry)| same_connection(&entry.store, store))
            .map(|(key, _)| key.clone());
        let Some(key) = owner else {
            debug!("release of unregistered store connection ignored");
            return Ok(());
        };

        let remaining = match entries.get_mut(&key) {
            Some(entry) => {
                entry.references -= 1;
                entry.references
            }
            None => return Ok(()),
        };
        if remaining > 0 {
            debug!(references = remaining, "released store connection reference");
            return Ok(());
        }

        if let Some(entry) = entries.remove(&key) {
            info!("closing store connection");
            entry.store.close().await?;
        }
        Ok(())
    }

    /// Live reference count for `config`, or `None` if it has no connection.
    pub async fn references(&self, config: &StoreConfig) -> Option<usize> {
        let key = config.registry_key().ok()?;
        self.entries.lock().await.get(&key).map(|e| e.references)
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn same_connection(a: &Arc<dyn KvStore>, b: &Arc<dyn KvStore>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
