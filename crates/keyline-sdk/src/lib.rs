//! High-level SDK for keyline.
//!
//! [`Sdk`] is the entry point: it owns a reference on a shared store
//! connection, carries the root key prefix and facade-wide hooks, and hands
//! out typed [`Query`]s.
//!
//! ```no_run
//! use keyline_sdk::{BaseInfo, Context, MemoryConnector, Model, Sdk, StoreConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Route {
//!     #[serde(flatten)]
//!     base: BaseInfo,
//!     uri: String,
//! }
//!
//! impl Model for Route {}
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let sdk = Sdk::connect(&MemoryConnector, StoreConfig::default(), Vec::new(), "/apisix").await?;
//! let ctx = Context::background();
//! let route = Route { base: BaseInfo::new("1"), uri: "/hello".into() };
//! sdk.new_query::<Route>().create(&ctx, "1", &route).await?;
//! sdk.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod sdk;

pub use config::SdkConfig;
pub use error::{SdkError, SdkResult};
pub use sdk::Sdk;

// Re-export key types
pub use keyline_merge::{merge_patch, merge_patch_bytes, MergeError};
pub use keyline_query::{
    Hook, HookParams, HookPipeline, KeyResolver, ListOutput, Query, QueryError, QueryHandle,
    QueryResult, Stage,
};
pub use keyline_store::{
    CancelHandle, ConnectionRegistry, Connector, Context, DeleteResponse, InMemoryKvStore, KeyValue,
    KvStore, MemoryConnector, PutResponse, Revision, StoreConfig, StoreError, StoreResult,
};
pub use keyline_types::{BaseInfo, HookMethod, Id, Model};
