//! Local fan-out of push events.
//!
//! [`EventHub`] is the small synchronous pub/sub registry through which the
//! client surfaces Event frames to application code. It is not part of the
//! wire protocol.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::lock::lock_ignore_poison;
use crate::{log_error, log_trace, Payload};

/// Callback invoked with the `data` of each matching event.
pub type Listener = Arc<dyn Fn(&Payload) + Send + Sync>;

/// Token returned by [`EventHub::on`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
}

/// Registry of event listeners keyed by event name.
///
/// - Listeners for one name run in registration order.
/// - `emit` works on a snapshot: a listener registered while an emission is
///   running is not called for that emission.
/// - A panicking listener is logged and skipped; later listeners still run.
#[derive(Default)]
pub struct EventHub {
    registry: Mutex<Registry>,
}

impl EventHub {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `event_name`.
    pub fn on<F>(&self, event_name: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        // ---
        let mut registry = lock_ignore_poison(&self.registry);
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry
            .listeners
            .entry(event_name.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&self, event_name: &str, id: ListenerId) -> bool {
        // ---
        let mut registry = lock_ignore_poison(&self.registry);

        let Some(list) = registry.listeners.get_mut(event_name) else {
            return false;
        };

        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;

        if list.is_empty() {
            registry.listeners.remove(event_name);
        }
        removed
    }

    /// Call every listener currently registered for `event_name`.
    ///
    /// Returns how many listeners were called, including any that panicked.
    pub fn emit(&self, event_name: &str, data: &Payload) -> usize {
        // ---
        let snapshot: Vec<Listener> = {
            let registry = lock_ignore_poison(&self.registry);
            match registry.listeners.get(event_name) {
                Some(list) => list.iter().map(|(_, l)| l.clone()).collect(),
                None => Vec::new(),
            }
        };

        log_trace!("event {event_name:?} -> {} listener(s)", snapshot.len());

        for listener in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(data))).is_err() {
                log_error!("listener for event {event_name:?} panicked");
            }
        }

        snapshot.len()
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        lock_ignore_poison(&self.registry)
            .listeners
            .get(event_name)
            .map_or(0, Vec::len)
    }
}
