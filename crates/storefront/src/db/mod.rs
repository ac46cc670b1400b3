//! Typed repositories over the document store.
//!
//! # Collections
//!
//! - `products` - catalog, ids assigned by the store
//! - `users` - profiles keyed by auth account id
//! - `orders` - keyed by `{userId}_{date}`
//! - `carts` - one per signed-in account, keyed by account id
//!
//! Guest carts never reach the store; they live in device storage.

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::gateway::{Document, Fields, StoreError};

/// Collection names.
pub mod collections {
    pub const PRODUCTS: &str = "products";
    pub const USERS: &str = "users";
    pub const ORDERS: &str = "orders";
    pub const CARTS: &str = "carts";
}

/// Failures mapping documents to and from domain records.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stored document does not match the expected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Serialize a record into document fields.
fn encode<T: Serialize>(record: &T) -> Result<Fields, RepositoryError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(RepositoryError::DataCorruption(format!(
            "record serialized to {other} instead of an object"
        ))),
        Err(e) => Err(RepositoryError::DataCorruption(e.to_string())),
    }
}

/// Deserialize a document body, naming the document on failure.
fn decode<T: DeserializeOwned>(collection: &str, doc: &Document) -> Result<T, RepositoryError> {
    doc.decode().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid {collection}/{}: {e}", doc.id))
    })
}
