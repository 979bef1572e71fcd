//! Revisioned key-value storage for keyline.
//!
//! keyline treats the backing store (etcd or anything with the same shape)
//! as an opaque service offering four primitives: get, put, delete and
//! prefix scan. Every mutation is stamped with a store-wide, monotonically
//! increasing revision.
//!
//! # Storage Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`InMemoryKvStore`] -- ordered in-memory store for tests and embedding
//!
//! # Connections
//!
//! Backends are opened through a [`Connector`] and shared through the
//! process-wide [`ConnectionRegistry`], which deduplicates connections by
//! their [`StoreConfig`] and reference-counts them. The registry is the one
//! piece of global mutable state in keyline.
//!
//! # Design Rules
//!
//! 1. The store never interprets values -- it is a pure key-value store.
//! 2. No compare-and-swap or multi-key transactions are used.
//! 3. Every call is bounded by a caller-supplied [`Context`].
//! 4. All backend errors are propagated, never silently ignored.

pub mod config;
pub mod connector;
pub mod context;
pub mod error;
pub mod memory;
pub mod registry;
pub mod traits;
pub mod types;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use connector::{Connector, MemoryConnector};
pub use context::{CancelHandle, Context};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKvStore;
pub use registry::ConnectionRegistry;
pub use traits::KvStore;
pub use types::{DeleteResponse, KeyValue, PutResponse, Revision};
