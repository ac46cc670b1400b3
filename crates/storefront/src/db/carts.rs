//! Remote cart repository for signed-in accounts.

use tracing::instrument;

use marketstall_core::{AccountId, Cart};

use super::{RepositoryError, collections::CARTS, decode, encode};
use crate::gateway::DocumentStore;

/// Repository for carts stored under `carts/{accountId}`.
pub struct CartRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// The stored cart for an account, if one was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the document is malformed.
    pub async fn get(&self, account: &AccountId) -> Result<Option<Cart>, RepositoryError> {
        let Some(doc) = self.store.get(CARTS, account.as_str()).await? else {
            return Ok(None);
        };
        let mut cart: Cart = decode(CARTS, &doc)?;
        cart.id = Some(account.clone());
        Ok(Some(cart.normalized()))
    }

    /// Overwrite the stored cart for an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    #[instrument(skip(self, cart), fields(total_items = cart.total_items()))]
    pub async fn save(&self, account: &AccountId, cart: &Cart) -> Result<(), RepositoryError> {
        self.store
            .set(CARTS, account.as_str(), encode(cart)?)
            .await?;
        Ok(())
    }
}
