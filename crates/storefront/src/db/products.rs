//! Product repository.

use tracing::instrument;

use marketstall_core::{Product, ProductDraft, ProductId};

use super::{RepositoryError, collections::PRODUCTS, decode, encode};
use crate::gateway::{Document, DocumentStore};

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    store: &'a dyn DocumentStore,
}

fn to_product(doc: &Document) -> Result<Product, RepositoryError> {
    let mut product: Product = decode(PRODUCTS, doc)?;
    product.id = ProductId::new(&doc.id);
    Ok(product)
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a document is malformed.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        self.store
            .query(PRODUCTS, None)
            .await?
            .iter()
            .map(to_product)
            .collect()
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the document is malformed.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.store
            .get(PRODUCTS, id.as_str())
            .await?
            .as_ref()
            .map(to_product)
            .transpose()
    }

    /// Store a validated draft under a new store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let id = self.store.create(PRODUCTS, encode(&draft)?).await?;
        Ok(draft.into_product(ProductId::new(id)))
    }

    /// Overwrite the editable fields of an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` with `StoreError::NotFound` if the
    /// product does not exist.
    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        id: &ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        self.store
            .update(PRODUCTS, id.as_str(), encode(&draft)?)
            .await?;
        Ok(draft.into_product(id.clone()))
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError> {
        Ok(self.store.delete(PRODUCTS, id.as_str()).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::Price;
    use serde_json::json;

    use super::*;
    use crate::gateway::{Fields, MemoryStore, StoreError};

    fn draft(title: &str) -> ProductDraft {
        ProductDraft {
            title: title.to_owned(),
            image: "https://img.example/p.png".to_owned(),
            price: Price::from_cents(1250),
            description: "desc".to_owned(),
            category: "technology".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = MemoryStore::new();
        let repo = ProductRepository::new(&store);

        let created = repo.create(draft("Lamp")).await.unwrap();
        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        let mut edit = created.to_draft();
        edit.price = Price::from_cents(999);
        repo.update(&created.id, edit).await.unwrap();
        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.price, Price::from_cents(999));

        repo.delete(&created.id).await.unwrap();
        assert!(repo.get(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_product_fails() {
        let store = MemoryStore::new();
        let err = ProductRepository::new(&store)
            .update(&ProductId::new("nope"), draft("Lamp"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Store(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_price_stored_as_number() {
        let store = MemoryStore::new();
        let created = ProductRepository::new(&store)
            .create(draft("Lamp"))
            .await
            .unwrap();
        let doc = store
            .get(PRODUCTS, created.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.fields["price"], json!(12.5));
    }

    #[tokio::test]
    async fn test_malformed_document_reported() {
        let store = MemoryStore::new();
        let mut fields = Fields::new();
        fields.insert("price".to_owned(), json!("free"));
        store.set(PRODUCTS, "bad", fields).await.unwrap();

        let err = ProductRepository::new(&store).list().await.unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(msg) if msg.contains("products/bad")));
    }
}
