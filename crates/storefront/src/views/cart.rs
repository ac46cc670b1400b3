//! Cart contents view.

use std::collections::HashMap;

use tokio::sync::watch;

use marketstall_core::{Cart, Price, Product, ProductId};

use super::{Loader, Resource};
use crate::error::Result;
use crate::services::CatalogService;
use crate::state::AppState;

/// One cart line with its product resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub product: Product,
    pub quantity: u32,
}

/// The cart as shown to the shopper.
///
/// Totals are the cart's own running totals, not a recomputation from
/// current prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub lines: Vec<CartLineView>,
    pub total_items: u32,
    pub total_price: Price,
}

/// Resolve product ids against the catalog, using the placeholder for ids
/// that no longer exist.
pub(super) async fn resolve_lines<'a>(
    catalog: &CatalogService,
    lines: impl IntoIterator<Item = (&'a ProductId, u32)>,
) -> Result<Vec<(Product, u32)>> {
    let products = catalog.products().await?;
    let by_id: HashMap<&ProductId, &Product> = products.iter().map(|p| (&p.id, p)).collect();
    Ok(lines
        .into_iter()
        .map(|(id, quantity)| {
            let product = by_id
                .get(id)
                .map_or_else(|| Product::placeholder(id.clone()), |p| (*p).clone());
            (product, quantity)
        })
        .collect())
}

async fn summarize(catalog: CatalogService, cart: Cart) -> Result<CartSummary> {
    let lines = resolve_lines(&catalog, cart.lines().map(|l| (l.product_id, l.quantity)))
        .await?
        .into_iter()
        .map(|(product, quantity)| CartLineView { product, quantity })
        .collect();
    Ok(CartSummary {
        lines,
        total_items: cart.total_items(),
        total_price: cart.total_price(),
    })
}

/// The shared cart with product details.
pub struct CartView {
    app: AppState,
    loader: Loader<(), CartSummary>,
}

impl CartView {
    #[must_use]
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            loader: Loader::new(),
        }
    }

    /// Rebuild the summary from the current cart.
    pub async fn refresh(&self) -> Resource<CartSummary> {
        let catalog = self.app.catalog().clone();
        let cart = self.app.cart().snapshot().await;
        self.loader
            .load((), |()| summarize(catalog, cart))
            .await
    }

    #[must_use]
    pub fn state(&self) -> Resource<CartSummary> {
        self.loader.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Resource<CartSummary>> {
        self.loader.subscribe()
    }
}
