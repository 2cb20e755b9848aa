//! Change notification for the shell history.
//!
//! Listeners are held weakly: the registry never keeps a listener alive. A
//! subscription ends either when its owner calls [`Listeners::unsubscribe`]
//! or when the last `Arc` to the listener is dropped, whichever comes first.
//! Dead entries are pruned lazily on the next notification.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

/// Receives shell history changes.
pub trait HistoryListener: Send + Sync {
    /// A command was appended to the history.
    fn entry_added(&self, command: &str);

    /// The whole history was emptied.
    fn history_cleared(&self);
}

/// Handle returned by [`Listeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    listener: Weak<dyn HistoryListener>,
}

impl Subscriber {
    fn is_same(&self, other: *const ()) -> bool {
        self.listener.as_ptr() as *const () == other
    }
}

#[derive(Default)]
pub struct Listeners {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` without taking ownership of it.
    ///
    /// Subscribing a listener that is already registered returns its existing id.
    pub fn subscribe<L: HistoryListener + 'static>(&mut self, listener: &Arc<L>) -> SubscriptionId {
        self.prune();
        let addr = Arc::as_ptr(listener) as *const ();
        if let Some(existing) = self.subscribers.iter().find(|s| s.is_same(addr)) {
            return existing.id;
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let weak: Weak<L> = Arc::downgrade(listener);
        let weak: Weak<dyn HistoryListener> = weak;
        self.subscribers.push(Subscriber { id, listener: weak });
        debug!(id = id.0, "history listener subscribed");
        id
    }

    /// Returns `false` if `id` was not (or no longer) subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        let removed = self.subscribers.len() != before;
        if removed {
            debug!(id = id.0, "history listener unsubscribed");
        }
        removed
    }

    /// Number of listeners that are still alive.
    pub fn len(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|s| s.listener.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify_entry_added(&mut self, command: &str) {
        self.fan_out("entry_added", |l| l.entry_added(command));
    }

    pub fn notify_history_cleared(&mut self) {
        self.fan_out("history_cleared", |l| l.history_cleared());
    }

    fn prune(&mut self) {
        self.subscribers.retain(|s| s.listener.strong_count() > 0);
    }

    // A panicking listener is logged and skipped; the rest still get the event.
    fn fan_out(&mut self, event: &'static str, deliver: impl Fn(&dyn HistoryListener)) {
        self.prune();
        let live: Vec<(SubscriptionId, Arc<dyn HistoryListener>)> = self
            .subscribers
            .iter()
            .filter_map(|s| s.listener.upgrade().map(|l| (s.id, l)))
            .collect();

        debug!(event, listeners = live.len(), "notifying history listeners");
        for (id, listener) in live {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| deliver(listener.as_ref())));
            if outcome.is_err() {
                warn!(event, id = id.0, "history listener panicked");
            }
        }
    }
}
