//! Catalog listing and product detail views.

use tokio::sync::watch;

use marketstall_core::{Category, Product, ProductId};

use super::{Loader, Resource};
use crate::state::AppState;

/// Product list, filtered client-side by an optional category.
pub struct CatalogView {
    app: AppState,
    loader: Loader<Option<Category>, Vec<Product>>,
}

impl CatalogView {
    #[must_use]
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            loader: Loader::new(),
        }
    }

    /// Show `category` (or everything for `None`), fetching if the filter
    /// changed.
    pub async fn show(&self, category: Option<Category>) -> Resource<Vec<Product>> {
        let catalog = self.app.catalog().clone();
        self.loader
            .load_if_changed(category, |category| async move {
                catalog.products_in(category).await
            })
            .await
    }

    /// Fetch again for the current filter.
    pub async fn refresh(&self) -> Resource<Vec<Product>> {
        let category = self.loader.key().flatten();
        let catalog = self.app.catalog().clone();
        self.loader
            .load(category, |category| async move {
                catalog.products_in(category).await
            })
            .await
    }

    #[must_use]
    pub fn state(&self) -> Resource<Vec<Product>> {
        self.loader.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Resource<Vec<Product>>> {
        self.loader.subscribe()
    }
}

/// One product by id.
pub struct ProductDetailView {
    app: AppState,
    loader: Loader<ProductId, Product>,
}

impl ProductDetailView {
    #[must_use]
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            loader: Loader::new(),
        }
    }

    /// Show the product `id`. A missing product resolves to the placeholder.
    pub async fn show(&self, id: ProductId) -> Resource<Product> {
        let catalog = self.app.catalog().clone();
        self.loader
            .load_if_changed(id, |id| async move { catalog.product(&id).await })
            .await
    }

    #[must_use]
    pub fn state(&self) -> Resource<Product> {
        self.loader.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Resource<Product>> {
        self.loader.subscribe()
    }
}
