//! Product catalog with a read-through cache.
//!
//! The full product list and single-product lookups are cached with a TTL.
//! Any create, edit or delete made through this service drops the whole
//! cache; edits made by other clients show up once the TTL expires.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info, instrument};

use marketstall_core::{Category, Product, ProductDraft, ProductId};

use crate::db::products::ProductRepository;
use crate::error::Result;
use crate::events::{EventBus, StateEvent};
use crate::gateway::DocumentStore;

const CATALOG_KEY: &str = "products";

#[derive(Clone)]
enum CacheValue {
    Catalog(Arc<Vec<Product>>),
    Product(Box<Product>),
}

/// Catalog reads and edits.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    store: Arc<dyn DocumentStore>,
    cache: Cache<String, CacheValue>,
    events: EventBus,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, ttl: Duration, events: EventBus) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self {
            inner: Arc::new(CatalogServiceInner {
                store,
                cache,
                events,
            }),
        }
    }

    fn repo(&self) -> ProductRepository<'_> {
        ProductRepository::new(self.inner.store.as_ref())
    }

    /// Every product.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<Product>>> {
        if let Some(CacheValue::Catalog(products)) = self.inner.cache.get(CATALOG_KEY).await {
            debug!("catalog cache hit");
            return Ok(products);
        }
        let products = Arc::new(self.repo().list().await?);
        self.inner
            .cache
            .insert(
                CATALOG_KEY.to_string(),
                CacheValue::Catalog(Arc::clone(&products)),
            )
            .await;
        Ok(products)
    }

    /// Products in `category`, or all of them for `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched.
    pub async fn products_in(&self, category: Option<Category>) -> Result<Vec<Product>> {
        let products = self.products().await?;
        Ok(products
            .iter()
            .filter(|p| category.is_none_or(|c| p.in_category(c)))
            .cloned()
            .collect())
    }

    /// One product, or the "Unknown Product" placeholder when it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    #[instrument(skip(self))]
    pub async fn product(&self, id: &ProductId) -> Result<Product> {
        let cache_key = format!("product:{id}");
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            return Ok(*product);
        }
        match self.repo().get(id).await? {
            Some(product) => {
                self.inner
                    .cache
                    .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
                    .await;
                Ok(product)
            }
            None => {
                debug!(product_id = %id, "product not found, using placeholder");
                Ok(Product::placeholder(id.clone()))
            }
        }
    }

    /// Validate and store a new product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Draft` if validation fails, or the store error.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: ProductDraft) -> Result<Product> {
        let product = self.repo().create(draft.validate()?).await?;
        info!(product_id = %product.id, "product created");
        self.catalog_changed().await;
        Ok(product)
    }

    /// Validate and apply an edit to an existing product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Draft` if validation fails, or the store error
    /// (not-found when the product does not exist).
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: &ProductId, draft: ProductDraft) -> Result<Product> {
        let product = self.repo().update(id, draft.validate()?).await?;
        info!(product_id = %id, "product updated");
        self.catalog_changed().await;
        Ok(product)
    }

    /// Delete a product. Carts and orders that reference it keep the id and
    /// render it as the placeholder.
    ///
    /// # Errors
    ///
    /// Returns the store error if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ProductId) -> Result<()> {
        self.repo().delete(id).await?;
        info!(product_id = %id, "product deleted");
        self.catalog_changed().await;
        Ok(())
    }

    /// Drop everything cached.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    async fn catalog_changed(&self) {
        self.invalidate().await;
        self.inner.events.emit(StateEvent::CatalogChanged);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::{DraftError, Price};
    use serde_json::json;

    use super::*;
    use crate::error::AppError;
    use crate::gateway::{Fields, MemoryStore};

    fn draft(title: &str, category: &str) -> ProductDraft {
        ProductDraft {
            title: title.to_owned(),
            image: "https://img.example/p.png".to_owned(),
            price: Price::from_cents(2500),
            description: "desc".to_owned(),
            category: category.to_owned(),
        }
    }

    fn service(store: Arc<MemoryStore>) -> CatalogService {
        CatalogService::new(store, Duration::from_secs(300), EventBus::new())
    }

    #[tokio::test]
    async fn test_missing_product_is_placeholder() {
        let catalog = service(Arc::new(MemoryStore::new()));
        let product = catalog.product(&ProductId::new("ghost")).await.unwrap();
        assert!(product.is_placeholder());
        assert_eq!(product.title, "Unknown Product");
        assert_eq!(product.id.as_str(), "ghost");
    }

    #[tokio::test]
    async fn test_create_validates_and_invalidates() {
        let catalog = service(Arc::new(MemoryStore::new()));
        assert!(catalog.products().await.unwrap().is_empty());

        let created = catalog.create(draft("Runner", "Shoes")).await.unwrap();
        assert_eq!(created.category, "shoes");
        assert_eq!(catalog.products().await.unwrap().len(), 1);

        let err = catalog.create(draft("Rock", "geology")).await.unwrap_err();
        assert!(matches!(err, AppError::Draft(DraftError::Category(_))));
    }

    #[tokio::test]
    async fn test_cache_serves_until_invalidated() {
        let store = Arc::new(MemoryStore::new());
        let catalog = service(store.clone());
        catalog.create(draft("Runner", "shoes")).await.unwrap();
        assert_eq!(catalog.products().await.unwrap().len(), 1);

        // written behind the cache's back
        let mut fields = Fields::new();
        fields.insert("title".to_owned(), json!("Sneaky"));
        store.set("products", "sneaky", fields).await.unwrap();
        assert_eq!(catalog.products().await.unwrap().len(), 1);

        catalog.invalidate().await;
        assert_eq!(catalog.products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_category_filter() {
        let catalog = service(Arc::new(MemoryStore::new()));
        catalog.create(draft("Runner", "shoes")).await.unwrap();
        catalog.create(draft("Laptop", "Technology")).await.unwrap();

        let shoes = catalog.products_in(Some(Category::Shoes)).await.unwrap();
        assert_eq!(shoes.len(), 1);
        assert_eq!(shoes[0].title, "Runner");
        assert_eq!(catalog.products_in(None).await.unwrap().len(), 2);
        assert!(
            catalog
                .products_in(Some(Category::Skincare))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_refresh_lookups() {
        let catalog = service(Arc::new(MemoryStore::new()));
        let created = catalog.create(draft("Runner", "shoes")).await.unwrap();
        assert_eq!(catalog.product(&created.id).await.unwrap().title, "Runner");

        let mut edit = created.to_draft();
        edit.title = "Trail Runner".to_owned();
        catalog.update(&created.id, edit).await.unwrap();
        assert_eq!(
            catalog.product(&created.id).await.unwrap().title,
            "Trail Runner"
        );

        catalog.delete(&created.id).await.unwrap();
        assert!(catalog.product(&created.id).await.unwrap().is_placeholder());
    }
}
