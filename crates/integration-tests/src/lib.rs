//! Integration tests for Marketstall.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketstall-integration-tests
//! ```
//!
//! Every test runs a full [`AppState`] over in-memory adapters, so no
//! backend needs to be running. [`FaultyStore`] and [`FaultyStorage`] wrap
//! the in-memory store and device storage and can be told to fail or stall
//! specific calls.
//!
//! # Test Categories
//!
//! - `cart_flow` - guest and signed-in carts, session switches
//! - `checkout` - orders, order history and order detail
//! - `persistence_failures` - rollback, optimistic carts, failed writes
//! - `accounts` - registration, sign-in and session subscriptions
//! - `views` - catalog, cart and stale-result handling

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use marketstall_core::{Category, Price, Product, ProductDraft};
use marketstall_storefront::auth::MemoryAuth;
use marketstall_storefront::config::StorefrontConfig;
use marketstall_storefront::gateway::{
    Document, DocumentStore, Fields, Filter, MemoryStore, StoreError,
};
use marketstall_storefront::services::PersistFailurePolicy;
use marketstall_storefront::storage::{DeviceStorage, MemoryStorage, StorageError};
use marketstall_storefront::{AppState, Backends};

/// Password accepted by the sign-up policy.
pub const PASSWORD: &str = "Sup3r$ecret";

#[derive(Default)]
struct Faults {
    failing_writes: HashSet<String>,
    failing_reads: HashSet<String>,
    /// Query stalls keyed by the filter value.
    query_delays: HashMap<String, Duration>,
}

/// [`MemoryStore`] with injectable failures.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    faults: Mutex<Faults>,
}

impl FaultyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Make every write to `collection` fail.
    pub fn fail_writes(&self, collection: &str) {
        self.faults().failing_writes.insert(collection.to_string());
    }

    /// Make every read from `collection` fail.
    pub fn fail_reads(&self, collection: &str) {
        self.faults().failing_reads.insert(collection.to_string());
    }

    /// Stall queries whose filter value equals `value`.
    pub fn delay_queries_for(&self, value: &str, delay: Duration) {
        self.faults().query_delays.insert(value.to_string(), delay);
    }

    /// Clear every injected fault.
    pub fn heal(&self) {
        *self.faults() = Faults::default();
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_write(&self, collection: &str) -> Result<(), StoreError> {
        if self.faults().failing_writes.contains(collection) {
            return Err(StoreError::Transport(format!("injected write failure on {collection}")));
        }
        Ok(())
    }

    fn check_read(&self, collection: &str) -> Result<(), StoreError> {
        if self.faults().failing_reads.contains(collection) {
            return Err(StoreError::Transport(format!("injected read failure on {collection}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.check_write(collection)?;
        self.inner.create(collection, fields).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_read(collection)?;
        self.inner.get(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>, StoreError> {
        self.check_read(collection)?;
        let delay = filter.and_then(|f| {
            let value = f.value.as_str()?;
            self.faults().query_delays.get(value).copied()
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.query(collection, filter).await
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.check_write(collection)?;
        self.inner.set(collection, id, fields).await
    }

    async fn update(&self, collection: &str, id: &str, partial: Fields) -> Result<(), StoreError> {
        self.check_write(collection)?;
        self.inner.update(collection, id, partial).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_write(collection)?;
        self.inner.delete(collection, id).await
    }
}

/// [`MemoryStorage`] whose writes can be switched off.
#[derive(Debug, Default)]
pub struct FaultyStorage {
    inner: MemoryStorage,
    failing: AtomicBool,
}

impl FaultyStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, key: &str) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: key.to_string(),
                message: "injected write failure".to_string(),
            });
        }
        Ok(())
    }
}

impl DeviceStorage for FaultyStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check(key)?;
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check(key)?;
        self.inner.remove_item(key)
    }
}

/// A started storefront over fault-injectable in-memory adapters.
pub struct TestContext {
    pub app: AppState,
    pub store: Arc<FaultyStore>,
    pub auth: Arc<MemoryAuth>,
    pub device: Arc<FaultyStorage>,
}

impl TestContext {
    /// Storefront with the default rollback policy.
    pub async fn new() -> Self {
        Self::with_policy(PersistFailurePolicy::Rollback).await
    }

    pub async fn with_policy(policy: PersistFailurePolicy) -> Self {
        Self::with_device(policy, Arc::new(FaultyStorage::new())).await
    }

    /// Storefront reusing an existing device storage, as a second launch on
    /// the same device would.
    pub async fn with_device(policy: PersistFailurePolicy, device: Arc<FaultyStorage>) -> Self {
        let store = Arc::new(FaultyStore::new());
        let auth = Arc::new(MemoryAuth::new());
        let mut config = StorefrontConfig::memory("target/marketstall-test");
        config.cart_failure_policy = policy;

        let backends = Backends {
            store: store.clone(),
            auth: auth.clone(),
            device: device.clone(),
        };
        let app = AppState::new(config, backends);
        app.start().await.expect("Failed to start storefront");

        Self {
            app,
            store,
            auth,
            device,
        }
    }

    /// Create a catalog product priced in cents.
    pub async fn seed_product(&self, title: &str, cents: u32, category: Category) -> Product {
        let draft = ProductDraft {
            title: title.to_string(),
            image: format!("https://cdn.example.com/{}.png", title.to_lowercase().replace(' ', "-")),
            price: Price::from_cents(cents),
            description: format!("{title} description"),
            category: category.as_str().to_string(),
        };
        self.app
            .catalog()
            .create(draft)
            .await
            .expect("Failed to seed product")
    }

    /// Guest cart document as it sits in device storage.
    pub fn guest_cart_json(&self) -> Option<serde_json::Value> {
        self.device
            .get_item(marketstall_storefront::storage::GUEST_CART_KEY)
            .expect("Failed to read device storage")
            .map(|raw| serde_json::from_str(&raw).expect("Guest cart is not JSON"))
    }
}

/// Wait until `check` passes, polling for up to a second.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}
