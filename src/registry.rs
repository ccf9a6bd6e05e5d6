//! ModelRegistry - named models owned by a hosting application.
//!
//! Adding a model publishes the `register` event on the registry's own
//! emitter. The registry is created and torn down explicitly by its owner.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::error::ModelError;
use crate::events::{Events, LifecycleEvent, ListenerId};
use crate::model::Model;

#[derive(Default)]
pub struct ModelRegistry {
    models: RwLock<IndexMap<String, Model>>,
    events: Events,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under its name. Names are unique per registry.
    pub fn add(&self, model: Model) -> Result<(), ModelError> {
        let name = model.name().to_string();
        {
            let mut models = self.write();
            if models.contains_key(&name) {
                return Err(ModelError::Definition(format!(
                    "model {} is already registered",
                    name
                )));
            }
            models.insert(name.clone(), model);
        }
        tracing::debug!(model = %name, "registered model");
        self.events.publish(LifecycleEvent::Register.as_str(), name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Model> {
        self.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Model> {
        self.write().shift_remove(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Tear down: drop every model and every `register` listener.
    pub fn clear(&self) {
        self.write().clear();
        self.events.unsubscribe_all(LifecycleEvent::Register.as_str());
    }

    /// Listen for `register`; the payload is the model name.
    pub fn on_register<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.events
            .subscribe(LifecycleEvent::Register.as_str(), listener)
    }

    pub fn unsubscribe(&self, id: &ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Model>> {
        self.models.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Model>> {
        self.models.write().unwrap_or_else(PoisonError::into_inner)
    }
}
