//! Read-through views.
//!
//! A view fetches entities for a key (a category filter, an id) and exposes
//! the fetch as an observable [`Resource`]. Changing the key starts a new
//! fetch; whatever the previous fetch returns afterwards is discarded.
//!
//! # Views
//!
//! - [`CatalogView`] - products, optionally filtered by category
//! - [`ProductDetailView`] - one product, placeholder when missing
//! - [`CartView`] - cart lines resolved against the catalog
//! - [`OrdersView`] / [`OrderDetailView`] - a user's orders, one order
//! - [`UsersView`] - all profiles

mod cart;
mod catalog;
mod orders;
mod users;

pub use cart::{CartLineView, CartSummary, CartView};
pub use catalog::{CatalogView, ProductDetailView};
pub use orders::{ORDER_NOT_FOUND, OrderDetail, OrderDetailView, OrderLineView, OrdersView};
pub use users::UsersView;

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::error::Result;

/// State of one read-through fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Resource<T> {
    /// Nothing requested yet.
    #[default]
    Idle,
    Loading,
    Succeeded(T),
    /// Fetch failed; the message is safe to show.
    Failed(String),
}

impl<T> Resource<T> {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The loaded data, if the fetch succeeded.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Succeeded(data) => Some(data),
            _ => None,
        }
    }

    /// The failure message, if the fetch failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

struct LoaderState<K> {
    key: Option<K>,
    generation: u64,
}

/// Runs keyed fetches and publishes their outcome.
///
/// Each fetch is tagged with a generation. Only the newest generation may
/// publish, so a slow fetch for an old key cannot overwrite a newer result.
pub struct Loader<K, T> {
    state: watch::Sender<Resource<T>>,
    current: Mutex<LoaderState<K>>,
}

impl<K, T> Default for Loader<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> Loader<K, T> {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Resource::Idle);
        Self {
            state,
            current: Mutex::new(LoaderState {
                key: None,
                generation: 0,
            }),
        }
    }

    /// Watch the resource state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Resource<T>> {
        self.state.subscribe()
    }

    /// Forget the key and go back to `Idle`. Any fetch in flight is
    /// discarded when it finishes.
    pub fn reset(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.key = None;
        current.generation += 1;
        self.state.send_replace(Resource::Idle);
    }
}

impl<K: Clone + PartialEq, T: Clone> Loader<K, T> {
    /// Current resource state.
    #[must_use]
    pub fn get(&self) -> Resource<T> {
        self.state.borrow().clone()
    }

    /// Key of the latest fetch.
    #[must_use]
    pub fn key(&self) -> Option<K> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .key
            .clone()
    }

    /// Fetch for `key` and publish the outcome unless a newer fetch started
    /// meanwhile. Returns the state as it stands afterwards.
    ///
    /// Every publish happens under the generation lock, so a stale state is
    /// never visible, even briefly.
    pub async fn load<F, Fut>(&self, key: K, fetch: F) -> Resource<T>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let generation = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            current.key = Some(key.clone());
            current.generation += 1;
            self.state.send_replace(Resource::Loading);
            current.generation
        };

        let outcome = match fetch(key).await {
            Ok(data) => Resource::Succeeded(data),
            Err(err) => {
                err.report();
                Resource::Failed(err.user_message())
            }
        };

        {
            let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if current.generation == generation {
                self.state.send_replace(outcome);
            } else {
                debug!(generation, "discarding stale fetch result");
            }
        }
        self.get()
    }

    /// Like [`Loader::load`], but does nothing when `key` is already loaded
    /// or loading.
    pub async fn load_if_changed<F, Fut>(&self, key: K, fetch: F) -> Resource<T>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let same_key = self.key().as_ref() == Some(&key);
        let settled = matches!(
            *self.state.borrow(),
            Resource::Loading | Resource::Succeeded(_)
        );
        if same_key && settled {
            return self.get();
        }
        self.load(key, fetch).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::oneshot;

    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_load_publishes_success_and_failure() {
        let loader: Loader<u32, String> = Loader::new();
        assert_eq!(loader.get(), Resource::Idle);

        let state = loader.load(1, |k| async move { Ok(format!("v{k}")) }).await;
        assert_eq!(state, Resource::Succeeded("v1".to_owned()));

        let state = loader
            .load(2, |_| async { Err(AppError::NotFound("Order not found.".to_owned())) })
            .await;
        assert_eq!(state, Resource::Failed("Order not found.".to_owned()));
    }

    #[tokio::test]
    async fn test_stale_result_discarded() {
        let loader: Arc<Loader<&'static str, &'static str>> = Arc::new(Loader::new());
        let (release, gate) = oneshot::channel::<()>();

        let slow = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move {
                loader
                    .load("old", |_| async move {
                        gate.await.unwrap();
                        Ok("old result")
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        while loader.key() != Some("old") {
            tokio::task::yield_now().await;
        }

        loader.load("new", |_| async { Ok("new result") }).await;
        release.send(()).unwrap();
        slow.await.unwrap();

        assert_eq!(loader.get(), Resource::Succeeded("new result"));
        assert_eq!(loader.key(), Some("new"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stale_result_never_published_while_newer_pending() {
        let loader: Arc<Loader<u32, u32>> = Arc::new(Loader::new());
        let (release_old, old_gate) = oneshot::channel::<()>();
        let (release_new, new_gate) = oneshot::channel::<()>();

        let old = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move {
                loader
                    .load(1, |k| async move {
                        old_gate.await.unwrap();
                        Ok(k)
                    })
                    .await
            })
        };
        while loader.key() != Some(1) {
            tokio::task::yield_now().await;
        }
        let new = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move {
                loader
                    .load(2, |k| async move {
                        new_gate.await.unwrap();
                        Ok(k)
                    })
                    .await
            })
        };
        while loader.key() != Some(2) {
            tokio::task::yield_now().await;
        }

        release_old.send(()).unwrap();
        assert_eq!(old.await.unwrap(), Resource::Loading);
        assert_eq!(loader.get(), Resource::Loading);

        release_new.send(()).unwrap();
        assert_eq!(new.await.unwrap(), Resource::Succeeded(2));
        assert_eq!(*loader.subscribe().borrow(), Resource::Succeeded(2));
    }

    #[tokio::test]
    async fn test_load_if_changed_skips_same_key() {
        let loader: Loader<u32, u32> = Loader::new();
        loader.load(7, |k| async move { Ok(k) }).await;

        let state = loader.load_if_changed(7, |_| async { Ok(99) }).await;
        assert_eq!(state, Resource::Succeeded(7));

        let state = loader.load_if_changed(8, |k| async move { Ok(k) }).await;
        assert_eq!(state, Resource::Succeeded(8));
    }

    #[tokio::test]
    async fn test_reset_returns_to_idle() {
        let loader: Loader<u32, u32> = Loader::new();
        let mut rx = loader.subscribe();
        loader.load(1, |k| async move { Ok(k) }).await;
        assert_eq!(*rx.borrow_and_update(), Resource::Succeeded(1));

        loader.reset();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Resource::Idle);
        assert_eq!(loader.key(), None);
    }
}
