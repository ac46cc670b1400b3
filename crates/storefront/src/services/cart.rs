//! Cart persistence and the serialized cart service.
//!
//! A signed-in account's cart lives in the document store at
//! `carts/{accountId}`; a guest cart lives in device storage under
//! [`GUEST_CART_KEY`]. Either way a write replaces the whole cart.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{instrument, warn};

use marketstall_core::{AccountId, Cart, Price, ProductId};

use crate::db::carts::CartRepository;
use crate::error::{Result, add_breadcrumb};
use crate::events::{EventBus, StateEvent};
use crate::gateway::DocumentStore;
use crate::storage::{DeviceStorage, GUEST_CART_KEY};

/// What happens to the in-memory cart when persisting a mutation fails.
///
/// The error is returned to the caller either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistFailurePolicy {
    /// Restore the cart to how it was before the mutation.
    #[default]
    Rollback,
    /// Keep the mutation in memory even though storage did not take it.
    KeepOptimistic,
}

#[derive(Debug, Error)]
#[error("unknown cart failure policy '{0}' (expected 'rollback' or 'optimistic')")]
pub struct UnknownPolicy(String);

impl FromStr for PersistFailurePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rollback" => Ok(Self::Rollback),
            "optimistic" | "keep-optimistic" => Ok(Self::KeepOptimistic),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Loads and saves carts for either kind of identity.
#[derive(Clone)]
pub struct CartStorage {
    store: Arc<dyn DocumentStore>,
    device: Arc<dyn DeviceStorage>,
}

impl CartStorage {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, device: Arc<dyn DeviceStorage>) -> Self {
        Self { store, device }
    }

    /// Load the cart for `account`, or the guest cart for `None`.
    ///
    /// A missing cart is empty. A guest cart that cannot be parsed is
    /// treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or device storage cannot be read, or if
    /// a remote cart document is malformed.
    #[instrument(skip(self), fields(account_id = account.map(AccountId::as_str)))]
    pub async fn load(&self, account: Option<&AccountId>) -> Result<Cart> {
        let Some(account) = account else {
            return self.load_guest();
        };
        let cart = CartRepository::new(self.store.as_ref())
            .get(account)
            .await?
            .unwrap_or_else(|| Cart::for_account(Some(account.clone())));
        Ok(cart)
    }

    fn load_guest(&self) -> Result<Cart> {
        let Some(raw) = self.device.get_item(GUEST_CART_KEY)? else {
            return Ok(Cart::new());
        };
        match serde_json::from_str::<Cart>(&raw) {
            Ok(cart) => Ok(cart.normalized()),
            Err(e) => {
                warn!(error = %e, "guest cart unreadable, starting empty");
                Ok(Cart::new())
            }
        }
    }

    /// Save `cart` for `account`, or as the guest cart for `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[instrument(skip(self, cart), fields(account_id = account.map(AccountId::as_str)))]
    pub async fn persist(&self, cart: &Cart, account: Option<&AccountId>) -> Result<()> {
        match account {
            Some(account) => {
                CartRepository::new(self.store.as_ref())
                    .save(account, cart)
                    .await?;
            }
            None => {
                let raw = serde_json::to_string(cart)
                    .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
                self.device.set_item(GUEST_CART_KEY, &raw)?;
            }
        }
        Ok(())
    }
}

/// The shopper's cart, shared by everything in the app.
///
/// Every mutation takes the cart lock and holds it until the write to
/// storage has finished, so mutations on one cart never interleave.
pub struct CartService {
    storage: CartStorage,
    policy: PersistFailurePolicy,
    events: EventBus,
    cart: Mutex<Cart>,
}

impl CartService {
    /// Create a service holding an empty guest cart.
    #[must_use]
    pub fn new(storage: CartStorage, policy: PersistFailurePolicy, events: EventBus) -> Self {
        Self {
            storage,
            policy,
            events,
            cart: Mutex::new(Cart::new()),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> PersistFailurePolicy {
        self.policy
    }

    #[must_use]
    pub const fn storage(&self) -> &CartStorage {
        &self.storage
    }

    /// A copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    /// Replace the in-memory cart with the stored cart for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails; the in-memory cart is left as it
    /// was.
    pub async fn load(&self, account: Option<AccountId>) -> Result<Cart> {
        let mut cart = self.cart.lock().await;
        let mut loaded = self.storage.load(account.as_ref()).await?;
        loaded.id = account;
        *cart = loaded;
        self.changed(&cart);
        Ok(cart.clone())
    }

    /// Add one unit of `product_id` at `unit_price` and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails. What remains in memory depends
    /// on the [`PersistFailurePolicy`].
    pub async fn add_item(&self, product_id: &ProductId, unit_price: Price) -> Result<Cart> {
        add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
        self.mutate(|cart| {
            cart.add_item(product_id, unit_price);
            true
        })
        .await
    }

    /// Remove one unit of `product_id` at `unit_price` and persist.
    ///
    /// Removing a product that is not in the cart changes nothing and writes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::add_item`].
    pub async fn remove_item(&self, product_id: &ProductId, unit_price: Price) -> Result<Cart> {
        add_breadcrumb("cart", "Removed item", Some(&[("product_id", product_id.as_str())]));
        self.mutate(|cart| cart.remove_item(product_id, unit_price))
            .await
    }

    /// Apply `change` under the cart lock and persist the result.
    ///
    /// `change` returns whether it modified the cart; an unmodified cart is
    /// not written.
    #[instrument(skip(self, change))]
    async fn mutate(&self, change: impl FnOnce(&mut Cart) -> bool + Send) -> Result<Cart> {
        let mut cart = self.cart.lock().await;
        let before = cart.clone();
        if !change(&mut cart) {
            return Ok(before);
        }
        if let Err(err) = self.storage.persist(&cart, cart.id.as_ref()).await {
            match self.policy {
                PersistFailurePolicy::Rollback => {
                    warn!(error = %err, "cart write failed, rolling back");
                    *cart = before;
                }
                PersistFailurePolicy::KeepOptimistic => {
                    warn!(error = %err, "cart write failed, keeping local change");
                    self.changed(&cart);
                }
            }
            return Err(err);
        }
        self.changed(&cart);
        Ok(cart.clone())
    }

    /// Hold the cart lock. Used by checkout so no mutation lands between the
    /// order snapshot and the reset.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().await
    }

    pub(crate) fn changed(&self, cart: &Cart) {
        self.events.emit(StateEvent::CartChanged {
            total_items: cart.total_items(),
        });
    }
}
