use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;
use crate::types::{DeleteResponse, KeyValue, PutResponse, Revision};

/// In-memory, ordered, revisioned key-value store.
///
/// Intended for tests and embedding. Keys are kept in a `BTreeMap` so prefix
/// scans come back in key order, and a single store-wide revision counter is
/// bumped by every mutation (the first mutation yields revision 1).
///
/// Two knobs make failure paths reachable in tests: an artificial latency
/// applied before every call, and an "unavailable" switch that makes every
/// call fail with [`StoreError::Unavailable`].
pub struct InMemoryKvStore {
    state: RwLock<State>,
    latency: RwLock<Option<Duration>>,
    unavailable: AtomicBool,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

#[derive(Default)]
struct State {
    revision: Revision,
    entries: BTreeMap<String, KeyValue>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            latency: RwLock::new(None),
            unavailable: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().expect("lock poisoned") = latency;
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The current store revision.
    pub fn revision(&self) -> Revision {
        self.state.read().expect("lock poisoned").revision
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").entries.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// How many times `close` has been called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Raw value at `key`, bypassing latency and availability knobs.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.state
            .read()
            .expect("lock poisoned")
            .entries
            .get(key)
            .map(|kv| kv.value.clone())
    }

    async fn admit(&self) -> StoreResult<()> {
        let latency = *self.latency.read().expect("lock poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<KeyValue>> {
        self.admit().await?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> StoreResult<PutResponse> {
        self.admit().await?;
        let mut state = self.state.write().expect("lock poisoned");
        state.revision += 1;
        let revision = state.revision;
        let prev_kv = state.entries.get(key).cloned();
        let (create_revision, version) = match &prev_kv {
            Some(prev) => (prev.create_revision, prev.version + 1),
            None => (revision, 1),
        };
        state.entries.insert(
            key.to_string(),
            KeyValue {
                key: key.to_string(),
                value,
                create_revision,
                mod_revision: revision,
                version,
            },
        );
        Ok(PutResponse { revision, prev_kv })
    }

    async fn delete(&self, key: &str) -> StoreResult<DeleteResponse> {
        self.admit().await?;
        let mut state = self.state.write().expect("lock poisoned");
        if state.entries.remove(key).is_none() {
            return Ok(DeleteResponse {
                revision: state.revision,
                deleted: 0,
            });
        }
        state.revision += 1;
        Ok(DeleteResponse {
            revision: state.revision,
            deleted: 1,
        })
    }

    async fn scan(&self, prefix: &str) -> StoreResult<Vec<KeyValue>> {
        self.admit().await?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, kv)| kv.clone())
            .collect())
    }

    async fn close(&self) -> StoreResult<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .field("revision", &self.revision())
            .field("closed", &self.is_closed())
            .finish()
    }
}
