use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{DeleteResponse, KeyValue, PutResponse};

/// Revisioned, prefix-addressable key-value store.
///
/// All implementations must satisfy these invariants:
/// - Every successful mutation returns a revision strictly greater than any
///   revision returned before it.
/// - Operations on a single key are linearizable; nothing is promised across
///   keys.
/// - Values are opaque strings; the store never interprets them.
/// - Implementations must be safe to call concurrently from many tasks.
///
/// Cancellation is cooperative through drop: callers bound each call with a
/// [`Context`](crate::Context) and drop the future when it expires.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a single key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<KeyValue>>;

    /// Write `value` at `key`, creating or overwriting it unconditionally.
    async fn put(&self, key: &str, value: String) -> StoreResult<PutResponse>;

    /// Delete a single key. A missing key is not an error: the response
    /// reports `deleted == 0`.
    async fn delete(&self, key: &str) -> StoreResult<DeleteResponse>;

    /// Every key starting with `prefix`, in ascending key order.
    async fn scan(&self, prefix: &str) -> StoreResult<Vec<KeyValue>>;

    /// Tear down the connection. Later calls fail with
    /// [`StoreError::Closed`](crate::StoreError::Closed).
    async fn close(&self) -> StoreResult<()>;
}
