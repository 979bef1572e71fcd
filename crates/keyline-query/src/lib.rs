//! Typed CRUD queries over a revisioned key-value store.
//!
//! A [`Query`] binds a model type to one collection of records and offers
//! create, get, update, delete, merge-patch and list. Records are stored as
//! JSON under `root / resource / record`, see [`KeyResolver`].
//!
//! # Hooks
//!
//! Successful operations are reported to [`Hook`]s through a
//! [`HookPipeline`]. Hooks observe; they cannot veto or alter the result.
//!
//! # Errors
//!
//! Every failure is a [`QueryError`]. Store failures carry the [`Stage`]
//! they happened in, and not-found is detectable through any amount of
//! wrapping with [`QueryError::is_not_found`].

pub mod error;
pub mod hook;
pub mod key;
pub mod list;
pub mod query;

pub use error::{QueryError, QueryResult, Stage};
pub use hook::{Hook, HookParams, HookPipeline, QueryHandle};
pub use key::{clean, join, resource_prefix, KeyResolver};
pub use list::{default_order, paginate, ListOutput};
pub use query::{FilterFn, FormatFn, Query, SortFn};
