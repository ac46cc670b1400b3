//! Application state shared across views and commands.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, broadcast, mpsc};
use tracing::{debug, info, instrument};

use marketstall_core::{AccountId, Cart, Order, ProductId};

use crate::auth::{Account, AuthGateway, HttpAuth, MemoryAuth, Subscription};
use crate::config::{BackendKind, StorefrontConfig};
use crate::error::{AppError, Result};
use crate::events::{EventBus, StateEvent};
use crate::gateway::{DocumentStore, HttpDocumentStore, MemoryStore};
use crate::services::{AccountService, CartService, CartStorage, CatalogService, CheckoutService};
use crate::storage::{DeviceStorage, FileStorage};

/// The three external collaborators the storefront talks to.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthGateway>,
    pub device: Arc<dyn DeviceStorage>,
}

impl Backends {
    /// Build the adapters named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device storage directory cannot be created or
    /// an HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let device: Arc<dyn DeviceStorage> = Arc::new(FileStorage::open(&config.data_dir)?);
        match &config.backend {
            BackendKind::Memory => Ok(Self {
                store: Arc::new(MemoryStore::new()),
                auth: Arc::new(MemoryAuth::new()),
                device,
            }),
            BackendKind::Http(http) => {
                let auth: Arc<dyn AuthGateway> = Arc::new(
                    HttpAuth::new(
                        http.auth_url.clone(),
                        http.api_key.clone(),
                        config.request_timeout,
                    )?
                    .with_storage(Arc::clone(&device)),
                );
                let store = HttpDocumentStore::new(
                    http.store_url.clone(),
                    http.api_key.clone(),
                    config.request_timeout,
                )?
                .with_auth(Arc::clone(&auth));
                Ok(Self {
                    store: Arc::new(store),
                    auth,
                    device,
                })
            }
        }
    }
}

/// Application state shared by everything in the storefront.
///
/// This struct is cheaply cloneable via `Arc`. It owns the services, the
/// shared cart and the event bus, and keeps the cart in step with the
/// signed-in identity once [`AppState::start`] has run.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backends: Backends,
    events: EventBus,
    catalog: CatalogService,
    cart: Arc<CartService>,
    checkout: CheckoutService,
    accounts: AccountService,
    /// Identity whose cart is in memory; `None` until the first load.
    cart_identity: AsyncMutex<Option<Option<AccountId>>>,
    session: Mutex<Option<Subscription>>,
}

impl AppState {
    /// Create application state over `backends`.
    #[must_use]
    pub fn new(config: StorefrontConfig, backends: Backends) -> Self {
        let events = EventBus::new();
        let catalog =
            CatalogService::new(Arc::clone(&backends.store), config.catalog_ttl, events.clone());
        let cart = Arc::new(CartService::new(
            CartStorage::new(Arc::clone(&backends.store), Arc::clone(&backends.device)),
            config.cart_failure_policy,
            events.clone(),
        ));
        let checkout =
            CheckoutService::new(Arc::clone(&backends.store), Arc::clone(&cart), events.clone());
        let accounts = AccountService::new(Arc::clone(&backends.auth), Arc::clone(&backends.store));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backends,
                events,
                catalog,
                cart,
                checkout,
                accounts,
                cart_identity: AsyncMutex::new(None),
                session: Mutex::new(None),
            }),
        }
    }

    /// Build adapters from `config` and create the state.
    ///
    /// # Errors
    ///
    /// See [`Backends::from_config`].
    pub fn from_config(config: StorefrontConfig) -> Result<Self> {
        let backends = Backends::from_config(&config)?;
        Ok(Self::new(config, backends))
    }

    /// Load the cart for whoever is signed in and follow session changes.
    ///
    /// Must be called from within a tokio runtime. Calling it again replaces
    /// the earlier session subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial cart load fails. Session tracking is
    /// set up regardless.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let identity = self.identity();
        let loaded = sync_cart(&self.inner, identity).await;

        // The handler only signals; the task re-reads the identity so a
        // backlog of signals never resurrects an older session.
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let subscription = self.inner.backends.auth.subscribe(Box::new(move |_| {
            let _ = tx.send(());
        }));
        *self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);

        let weak: Weak<AppStateInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let identity = inner.backends.auth.current().map(|a| a.id);
                if let Err(err) = sync_cart(&inner, identity).await {
                    err.report();
                }
            }
            debug!("session tracking stopped");
        });

        loaded
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.backends.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthGateway> {
        &self.inner.backends.auth
    }

    #[must_use]
    pub fn device(&self) -> &Arc<dyn DeviceStorage> {
        &self.inner.backends.device
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    /// Receive every [`StateEvent`] emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.events.subscribe()
    }

    /// Account id of the signed-in user.
    #[must_use]
    pub fn identity(&self) -> Option<AccountId> {
        self.inner.backends.auth.current().map(|a| a.id)
    }

    /// Add one unit of a product at its current catalog price.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown product, or the cart
    /// persistence error.
    pub async fn add_to_cart(&self, product_id: &ProductId) -> Result<Cart> {
        let product = self.inner.catalog.product(product_id).await?;
        if product.is_placeholder() {
            return Err(AppError::NotFound("Product not found.".to_string()));
        }
        self.inner.cart.add_item(product_id, product.price).await
    }

    /// Remove one unit of a product at its current catalog price.
    ///
    /// A product that has since been deleted is removed at price zero.
    ///
    /// # Errors
    ///
    /// Returns the cart persistence error.
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<Cart> {
        let product = self.inner.catalog.product(product_id).await?;
        self.inner.cart.remove_item(product_id, product.price).await
    }

    /// Place an order for the cart as the signed-in user (or guest).
    ///
    /// The cart is first switched to the current session, so a sign-in the
    /// session task has not picked up yet never checks out another owner's
    /// cart.
    ///
    /// # Errors
    ///
    /// Returns the cart load error, or see [`CheckoutService::checkout`].
    pub async fn checkout(&self) -> Result<Order> {
        sync_cart(&self.inner, self.identity()).await?;
        self.inner.checkout.checkout().await
    }

    /// Register and switch the cart to the new account.
    ///
    /// # Errors
    ///
    /// See [`AccountService::register`].
    pub async fn register(&self, email: &str, password: &str) -> Result<Account> {
        let account = self.inner.accounts.register(email, password).await?;
        sync_cart(&self.inner, Some(account.id.clone())).await?;
        Ok(account)
    }

    /// Sign in and switch the cart to the account's cart.
    ///
    /// # Errors
    ///
    /// See [`AccountService::login`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Account> {
        let account = self.inner.accounts.login(email, password).await?;
        sync_cart(&self.inner, Some(account.id.clone())).await?;
        Ok(account)
    }

    /// Sign out and switch back to the guest cart.
    ///
    /// # Errors
    ///
    /// See [`AccountService::logout`].
    pub async fn logout(&self) -> Result<()> {
        self.inner.accounts.logout().await?;
        sync_cart(&self.inner, None).await
    }
}

/// Make sure the in-memory cart belongs to `identity`, loading it if not.
async fn sync_cart(inner: &AppStateInner, identity: Option<AccountId>) -> Result<()> {
    let mut current = inner.cart_identity.lock().await;
    if current.as_ref() == Some(&identity) {
        return Ok(());
    }
    let switching = current.is_some();
    inner.cart.load(identity.clone()).await?;
    if switching {
        info!(
            account_id = identity.as_ref().map(AccountId::as_str),
            "session changed, cart reloaded"
        );
        inner.events.emit(StateEvent::SessionChanged(identity.clone()));
    }
    *current = Some(identity);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::{Price, ProductDraft};

    use super::*;
    use crate::storage::MemoryStorage;

    fn state() -> AppState {
        AppState::new(
            StorefrontConfig::memory(".unused"),
            Backends {
                store: Arc::new(MemoryStore::new()),
                auth: Arc::new(MemoryAuth::new()),
                device: Arc::new(MemoryStorage::new()),
            },
        )
    }

    async fn product(state: &AppState, cents: u32) -> ProductId {
        state
            .catalog()
            .create(ProductDraft {
                title: "Mug".to_owned(),
                image: "https://img.example/mug.png".to_owned(),
                price: Price::from_cents(cents),
                description: "Holds coffee".to_owned(),
                category: "technology".to_owned(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_add_to_cart_uses_catalog_price() {
        let state = state();
        state.start().await.unwrap();
        let id = product(&state, 1250).await;

        state.add_to_cart(&id).await.unwrap();
        let cart = state.add_to_cart(&id).await.unwrap();
        assert_eq!(cart.total_price(), Price::from_cents(2500));

        let err = state
            .add_to_cart(&ProductId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_login_and_logout_swap_carts() {
        let state = state();
        state.start().await.unwrap();
        let id = product(&state, 1000).await;
        state.add_to_cart(&id).await.unwrap();

        state
            .register("ada@example.com", "Sunflower7!")
            .await
            .unwrap();
        assert!(state.cart().snapshot().await.is_empty());
        state.add_to_cart(&id).await.unwrap();
        state.add_to_cart(&id).await.unwrap();

        state.logout().await.unwrap();
        assert_eq!(state.cart().snapshot().await.total_items(), 1);

        state.login("ada@example.com", "Sunflower7!").await.unwrap();
        assert_eq!(state.cart().snapshot().await.total_items(), 2);
    }

    #[tokio::test]
    async fn test_checkout_uses_identity() {
        let state = state();
        state.start().await.unwrap();
        let id = product(&state, 1000).await;
        let account = state
            .register("ada@example.com", "Sunflower7!")
            .await
            .unwrap();
        state.add_to_cart(&id).await.unwrap();

        let order = state.checkout().await.unwrap();
        assert_eq!(order.user_id, account.id.as_str());
        assert!(state.cart().snapshot().await.is_empty());
    }
}
