//! Remote document store gateway.
//!
//! The storefront owns no database. Every product, profile, cart and order
//! lives in a hosted document store reached through [`DocumentStore`].
//!
//! # Adapters
//!
//! - [`MemoryStore`] - process-local store for tests and offline demos
//! - [`HttpDocumentStore`] - JSON-over-HTTP document API
//!
//! # Semantics
//!
//! - `set` is a full-document overwrite (last writer wins)
//! - `update` merges top-level fields and fails if the document is absent
//! - `get` of an absent document is `Ok(None)`, never an error

mod http;
mod memory;
mod store;

pub use http::HttpDocumentStore;
pub use memory::MemoryStore;
pub use store::{Document, DocumentStore, Fields, Filter, FilterOp, StoreError};
