use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use keyline_query::{Hook, Query};
use keyline_store::{ConnectionRegistry, Connector, KvStore, StoreConfig};
use keyline_types::Model;
use tracing::{debug, warn};

use crate::config::SdkConfig;
use crate::error::SdkResult;

/// Handle on one shared store connection.
///
/// Handles built from identical [`StoreConfig`]s share a single connection
/// through the process-wide [`ConnectionRegistry`]. Each handle owns one
/// reference on it until [`Sdk::close`].
pub struct Sdk {
    store: Arc<dyn KvStore>,
    config: StoreConfig,
    hooks: Arc<[Hook]>,
    prefix: String,
    closed: AtomicBool,
}

impl Sdk {
    /// Acquire a connection for `config` and wrap it in a handle.
    ///
    /// `hooks` observe every query created from the handle. `prefix` is the
    /// root key prefix those queries store under.
    pub async fn connect(
        connector: &dyn Connector,
        config: StoreConfig,
        hooks: Vec<Hook>,
        prefix: impl Into<String>,
    ) -> SdkResult<Self> {
        let store = ConnectionRegistry::global().acquire(connector, &config).await?;
        let prefix = prefix.into();
        debug!(endpoints = ?config.endpoints, prefix = %prefix, hooks = hooks.len(), "sdk handle ready");
        Ok(Self {
            store,
            config,
            hooks: hooks.into(),
            prefix,
            closed: AtomicBool::new(false),
        })
    }

    pub async fn from_config(connector: &dyn Connector, config: &SdkConfig, hooks: Vec<Hook>) -> SdkResult<Self> {
        config.validate()?;
        Self::connect(connector, config.store.clone(), hooks, config.prefix.clone()).await
    }

    /// A fresh query over the collection of `M`, inheriting the connection,
    /// root prefix and hooks of this handle.
    pub fn new_query<M: Model>(&self) -> Query<M> {
        Query::new(self.store.clone(), self.prefix.clone(), self.hooks.clone())
    }

    /// Give this handle's connection reference back to the registry. The
    /// connection closes when its last handle does. Closing twice is a no-op.
    pub async fn close(&self) -> SdkResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        ConnectionRegistry::global().release(&self.store).await?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn store_config(&self) -> &StoreConfig {
        &self.config
    }
}

impl Drop for Sdk {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!(endpoints = ?self.config.endpoints, "sdk handle dropped without close; connection reference leaked");
        }
    }
}

impl std::fmt::Debug for Sdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("endpoints", &self.config.endpoints)
            .field("prefix", &self.prefix)
            .field("hooks", &self.hooks.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
