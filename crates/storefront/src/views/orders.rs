//! Order history and order detail views.

use tokio::sync::watch;

use marketstall_core::{Order, OrderId, Product, UserProfile};

use super::cart::resolve_lines;
use super::{Loader, Resource};
use crate::db::orders::OrderRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Message shown when an order id does not resolve.
pub const ORDER_NOT_FOUND: &str = "Order not found.";

/// Orders placed by one user id (an account id or `"guest"`).
pub struct OrdersView {
    app: AppState,
    loader: Loader<String, Vec<Order>>,
}

impl OrdersView {
    #[must_use]
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            loader: Loader::new(),
        }
    }

    /// Show the orders of `user_id`, newest first.
    pub async fn show(&self, user_id: impl Into<String>) -> Resource<Vec<Order>> {
        let store = self.app.store().clone();
        self.loader
            .load_if_changed(user_id.into(), |user_id| async move {
                Ok(OrderRepository::new(store.as_ref())
                    .list_for_user(&user_id)
                    .await?)
            })
            .await
    }

    #[must_use]
    pub fn state(&self) -> Resource<Vec<Order>> {
        self.loader.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Resource<Vec<Order>>> {
        self.loader.subscribe()
    }
}

/// One order line with its product resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineView {
    pub product: Product,
    pub quantity: u32,
}

/// An order with its lines and buyer resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLineView>,
    /// Buyer profile; the guest shopper for guest orders or missing profiles.
    pub buyer: UserProfile,
}

/// One order by id.
pub struct OrderDetailView {
    app: AppState,
    loader: Loader<OrderId, OrderDetail>,
}

impl OrderDetailView {
    #[must_use]
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            loader: Loader::new(),
        }
    }

    /// Show order `id`. A missing order is `Failed("Order not found.")`.
    pub async fn show(&self, id: OrderId) -> Resource<OrderDetail> {
        let app = self.app.clone();
        self.loader
            .load_if_changed(id, |id| async move { order_detail(&app, &id).await })
            .await
    }

    #[must_use]
    pub fn state(&self) -> Resource<OrderDetail> {
        self.loader.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Resource<OrderDetail>> {
        self.loader.subscribe()
    }
}

async fn order_detail(app: &AppState, id: &OrderId) -> Result<OrderDetail> {
    let order = OrderRepository::new(app.store().as_ref())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))?;

    let lines = resolve_lines(app.catalog(), order.products.iter().map(|(id, q)| (id, *q)))
        .await?
        .into_iter()
        .map(|(product, quantity)| OrderLineView { product, quantity })
        .collect();

    let buyer = match order.account() {
        Some(account) => match UserRepository::new(app.store().as_ref()).get(&account).await {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile::guest_shopper(),
            Err(err) => {
                tracing::warn!(error = %err, "buyer lookup failed, showing guest shopper");
                UserProfile::guest_shopper()
            }
        },
        None => UserProfile::guest_shopper(),
    };

    Ok(OrderDetail {
        order,
        lines,
        buyer,
    })
}
