//! Order repository.

use tracing::instrument;

use marketstall_core::{Order, OrderId};

use super::{RepositoryError, collections::ORDERS, decode, encode};
use crate::gateway::{Document, DocumentStore, Filter};

/// Repository for placed orders.
pub struct OrderRepository<'a> {
    store: &'a dyn DocumentStore,
}

fn to_order(doc: &Document) -> Result<Order, RepositoryError> {
    let mut order: Order = decode(ORDERS, doc)?;
    order.id = OrderId::new(&doc.id);
    Ok(order)
}

/// Newest first, by the stored ISO date (which sorts lexically).
fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    orders
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Write a new order under its derived id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn place(&self, order: &Order) -> Result<(), RepositoryError> {
        self.store
            .set(ORDERS, order.id.as_str(), encode(order)?)
            .await?;
        Ok(())
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the document is malformed.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        self.store
            .get(ORDERS, id.as_str())
            .await?
            .as_ref()
            .map(to_order)
            .transpose()
    }

    /// Orders placed by `user_id` (an account id or `"guest"`), newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a document is malformed.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, RepositoryError> {
        let docs = self
            .store
            .query(ORDERS, Some(&Filter::eq("userId", user_id)))
            .await?;
        docs.iter()
            .map(to_order)
            .collect::<Result<_, _>>()
            .map(newest_first)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a document is malformed.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let docs = self.store.query(ORDERS, None).await?;
        docs.iter()
            .map(to_order)
            .collect::<Result<_, _>>()
            .map(newest_first)
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &OrderId) -> Result<(), RepositoryError> {
        Ok(self.store.delete(ORDERS, id.as_str()).await?)
    }
}
