//! Checkout: turn the cart into an order and reset it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{Span, error, info, instrument};

use marketstall_core::Order;

use super::cart::CartService;
use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::events::{EventBus, StateEvent};
use crate::gateway::DocumentStore;

/// Places orders from the shared cart.
pub struct CheckoutService {
    store: Arc<dyn DocumentStore>,
    cart: Arc<CartService>,
    events: EventBus,
}

impl CheckoutService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, cart: Arc<CartService>, events: EventBus) -> Self {
        Self {
            store,
            cart,
            events,
        }
    }

    /// Write an order for the current cart, then empty the cart.
    ///
    /// The buyer is the cart's owner, read under the same lock as the
    /// snapshot; a guest cart places a guest order. The cart stays locked
    /// from snapshot to reset.
    ///
    /// If the reset cannot be persisted the order still stands: the cart is
    /// emptied in memory, the failure is reported, and the order is returned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty cart, or the store error
    /// if the order write fails. In both cases nothing is written and the
    /// cart is untouched.
    #[instrument(skip(self), fields(account_id = tracing::field::Empty))]
    pub async fn checkout(&self) -> Result<Order> {
        let mut cart = self.cart.lock().await;
        let owner = cart.id.clone();
        if let Some(owner) = &owner {
            Span::current().record("account_id", owner.as_str());
        }
        if cart.is_empty() {
            return Err(AppError::Validation("Your cart is empty.".to_string()));
        }

        let order = Order::snapshot(&cart, owner.as_ref(), Utc::now());
        OrderRepository::new(self.store.as_ref())
            .place(&order)
            .await?;
        info!(
            order_id = %order.id,
            total_items = order.total_items,
            total_price = %order.total_price,
            "order placed"
        );
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
        self.events.emit(StateEvent::OrderPlaced(order.id.clone()));

        cart.checkout();
        if let Err(err) = self.cart.storage().persist(&cart, owner.as_ref()).await {
            let event_id = sentry::capture_error(&err);
            error!(
                error = %err,
                sentry_event_id = %event_id,
                order_id = %order.id,
                "order placed but cart reset was not saved"
            );
        }
        self.cart.changed(&cart);
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::{AccountId, GUEST_USER_ID, Price, ProductId};

    use super::*;
    use crate::gateway::MemoryStore;
    use crate::services::cart::{CartStorage, PersistFailurePolicy};
    use crate::storage::MemoryStorage;

    fn setup() -> (Arc<MemoryStore>, Arc<CartService>, CheckoutService) {
        let store = Arc::new(MemoryStore::new());
        let storage = CartStorage::new(store.clone(), Arc::new(MemoryStorage::new()));
        let events = EventBus::new();
        let cart = Arc::new(CartService::new(
            storage,
            PersistFailurePolicy::Rollback,
            events.clone(),
        ));
        let checkout = CheckoutService::new(store.clone(), cart.clone(), events);
        (store, cart, checkout)
    }

    #[tokio::test]
    async fn test_guest_checkout_snapshots_and_resets() {
        let (store, cart, checkout) = setup();
        let p1 = ProductId::new("p1");
        cart.add_item(&p1, Price::from_cents(1000)).await.unwrap();
        cart.add_item(&p1, Price::from_cents(1000)).await.unwrap();

        let order = checkout.checkout().await.unwrap();
        assert_eq!(order.user_id, GUEST_USER_ID);
        assert_eq!(order.products.get(&p1), Some(&2));
        assert_eq!(order.total_items, 2);
        assert_eq!(order.total_price, Price::from_cents(2000));
        assert!(order.id.as_str().starts_with("guest_"));

        let after = cart.snapshot().await;
        assert!(after.is_empty());
        assert_eq!(after.total_items(), 0);
        assert!(after.total_price().is_zero());
        assert_eq!(store.len("orders").await, 1);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let (store, _, checkout) = setup();
        let err = checkout.checkout().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.len("orders").await, 0);
    }

    #[tokio::test]
    async fn test_account_checkout_keys_order_by_account() {
        let (_, cart, checkout) = setup();
        let account = AccountId::new("uid-1");
        cart.load(Some(account.clone())).await.unwrap();
        cart.add_item(&ProductId::new("p1"), Price::from_cents(500))
            .await
            .unwrap();

        let order = checkout.checkout().await.unwrap();
        assert_eq!(order.user_id, "uid-1");
        assert!(order.id.as_str().starts_with("uid-1_"));
        assert_eq!(order.account(), Some(account));
    }
}
