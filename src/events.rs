//! Event capability shared by instances, collections and the model registry.
//!
//! Each owner embeds its own [`Events`] rather than inheriting emitter
//! behaviour. Payloads are JSON strings. `publish` returns only after every
//! listener has finished, so anything published before a callback has been
//! observed by the time the callback runs. Listeners still run on worker
//! threads, so anything they touch must be `Send + Sync`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use event_emitter_rs::EventEmitter;

/// Lifecycle events published by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// An instance was saved.
    Save,
    /// An instance was deleted.
    Delete,
    /// A model was added to a registry.
    Register,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Save => "save",
            LifecycleEvent::Delete => "delete",
            LifecycleEvent::Register => "register",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`Events::subscribe`], used to unsubscribe one listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(String);

/// Owned event emitter with subscribe/publish/unsubscribe forwarding.
pub struct Events {
    emitter: Mutex<EventEmitter>,
    // event name -> listener ids, so a whole event can be cleared
    listeners: Mutex<HashMap<String, Vec<String>>>,
}

impl Events {
    pub fn new() -> Self {
        Events {
            emitter: Mutex::new(EventEmitter::new()),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Register a listener for `event`.
    pub fn subscribe<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let id = lock(&self.emitter).on(event, move |payload: String| listener(payload));
        lock(&self.listeners)
            .entry(event.to_string())
            .or_default()
            .push(id.clone());
        ListenerId(id)
    }

    /// Publish `payload` to every listener of `event` and wait for them.
    ///
    /// The emitter lock is released before waiting, so a listener may
    /// subscribe or publish on the same owner.
    pub fn publish(&self, event: &str, payload: impl Into<String>) {
        let payload = payload.into();
        tracing::trace!(event, "publishing event");
        let handles = lock(&self.emitter).emit(event, payload);
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!(event, "event listener panicked");
            }
        }
    }

    /// Remove one listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: &ListenerId) -> bool {
        let removed = lock(&self.emitter).remove_listener(&id.0).is_some();
        if removed {
            for ids in lock(&self.listeners).values_mut() {
                ids.retain(|existing| existing != &id.0);
            }
        }
        removed
    }

    /// Remove every listener of `event`. Returns how many were removed.
    pub fn unsubscribe_all(&self, event: &str) -> usize {
        let ids = lock(&self.listeners).remove(event).unwrap_or_default();
        let mut emitter = lock(&self.emitter);
        ids.iter()
            .filter(|id| emitter.remove_listener(id).is_some())
            .count()
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        lock(&self.listeners).get(event).map_or(0, Vec::len)
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = lock(&self.listeners);
        let mut names: Vec<_> = listeners.keys().collect();
        names.sort();
        f.debug_struct("Events").field("events", &names).finish()
    }
}

// A poisoned map is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
