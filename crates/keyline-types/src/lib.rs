//! Foundation types for keyline.
//!
//! This crate provides the record-level types shared by every other keyline
//! crate: the identity block embedded in most models, the [`Model`] trait
//! that binds a Rust type to a stored collection, and the [`HookMethod`]
//! names used to filter observers.
//!
//! # Key Types
//!
//! - [`Id`] -- String identifier that also accepts numeric JSON input
//! - [`BaseInfo`] -- Optional embedded identity and timestamps block
//! - [`Model`] -- Record type bound, with optional key-prefix and base-info capabilities
//! - [`HookMethod`] -- The CRUD/List method a hook observes

pub mod base_info;
pub mod error;
pub mod id;
pub mod method;
pub mod model;

pub use base_info::BaseInfo;
pub use error::TypeError;
pub use id::Id;
pub use method::HookMethod;
pub use model::Model;
