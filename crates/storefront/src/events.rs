//! Application state change notifications.

use tokio::sync::broadcast;

use marketstall_core::{AccountId, OrderId};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Something observable changed in the application state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A user signed in (`Some`) or out (`None`).
    SessionChanged(Option<AccountId>),
    /// The in-memory cart changed: a mutation, a reload, or a checkout reset.
    CartChanged { total_items: u32 },
    /// Products were created, edited or deleted through this client.
    CatalogChanged,
    /// An order was written.
    OrderPlaced(OrderId),
}

/// Fan-out of [`StateEvent`]s to any number of receivers.
///
/// Emitting with no receivers is not an error; the event is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StateEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn emit(&self, event: StateEvent) {
        tracing::trace!(?event, "state event");
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.sender.subscribe()
    }
}
