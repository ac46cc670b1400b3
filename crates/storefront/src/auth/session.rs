//! Session change fan-out.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::Account;

/// Callback invoked with the current account on every session change.
pub type SessionHandler = Box<dyn Fn(Option<&Account>) + Send + Sync>;

type SharedHandler = Arc<dyn Fn(Option<&Account>) + Send + Sync>;

#[derive(Default)]
struct HubState {
    current: Option<Account>,
    next_id: u64,
    handlers: BTreeMap<u64, SharedHandler>,
}

/// Holds the current session and the handlers that want to hear about it.
///
/// Handlers run on the thread that publishes the change, outside the hub's
/// lock, so a handler may subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct SessionHub {
    state: Arc<Mutex<HubState>>,
}

impl std::fmt::Debug for SessionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("SessionHub")
            .field("current", &state.current)
            .field("handlers", &state.handlers.len())
            .finish()
    }
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The account currently signed in.
    #[must_use]
    pub fn current(&self) -> Option<Account> {
        lock(&self.state).current.clone()
    }

    /// Register `handler`. It is called right away with the current account
    /// and then after every [`publish`](Self::publish).
    pub fn subscribe(&self, handler: SessionHandler) -> Subscription {
        let handler: SharedHandler = Arc::from(handler);
        let (id, current) = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            state.handlers.insert(id, Arc::clone(&handler));
            (id, state.current.clone())
        };
        handler(current.as_ref());
        Subscription {
            hub: Arc::downgrade(&self.state),
            id: Some(id),
        }
    }

    /// Record a new session state and notify every handler.
    pub fn publish(&self, account: Option<Account>) {
        let handlers: Vec<SharedHandler> = {
            let mut state = lock(&self.state);
            state.current.clone_from(&account);
            state.handlers.values().cloned().collect()
        };
        tracing::debug!(
            signed_in = account.is_some(),
            handlers = handlers.len(),
            "session changed"
        );
        for handler in handlers {
            handler(account.as_ref());
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).handlers.len()
    }
}

/// Handle returned by [`SessionHub::subscribe`].
///
/// Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    hub: Weak<Mutex<HubState>>,
    id: Option<u64>,
}

impl Subscription {
    /// Stop receiving session changes. Calling it twice is harmless.
    pub fn unsubscribe(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(state) = self.hub.upgrade() {
            lock(&state).handlers.remove(&id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
