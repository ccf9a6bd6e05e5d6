//! Instance - a single record bound to a model, with lifecycle flags.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::events::{Events, LifecycleEvent, ListenerId};
use crate::model::ID_FIELD;

/// Field values of a record.
pub type Values = serde_json::Map<String, Value>;

struct InstanceState {
    model: String,
    values: RwLock<Values>,
    dirty: AtomicBool,
    deleted: AtomicBool,
    events: Events,
}

/// A record bound to a model.
///
/// `Instance` is a shared handle: clones refer to the same record, so flags
/// updated by the model after a save or delete are visible to every holder.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceState>,
}

impl Instance {
    /// A new, unsaved record. Starts dirty.
    pub fn new(model: impl Into<String>, values: Values) -> Self {
        Self::with_state(model.into(), values, true)
    }

    /// A record as persisted or loaded by a connector. Starts clean.
    pub fn stored(model: impl Into<String>, values: Values) -> Self {
        Self::with_state(model.into(), values, false)
    }

    fn with_state(model: String, values: Values, dirty: bool) -> Self {
        Instance {
            inner: Arc::new(InstanceState {
                model,
                values: RwLock::new(values),
                dirty: AtomicBool::new(dirty),
                deleted: AtomicBool::new(false),
                events: Events::new(),
            }),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.inner.model
    }

    /// Primary key, if the record has one.
    pub fn id(&self) -> Option<Value> {
        self.get(ID_FIELD).filter(|id| !id.is_null())
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.read().get(field).cloned()
    }

    /// Set a field value and mark the record dirty.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field.into(), value.into());
        self.inner.dirty.store(true, Ordering::SeqCst);
    }

    /// Snapshot of all field values.
    pub fn values(&self) -> Values {
        self.read().clone()
    }

    /// True if mutated since it was last persisted.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// True once a delete has succeeded.
    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::SeqCst)
    }

    /// True if both handles refer to the same record.
    pub fn same(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Field values as compact JSON.
    pub fn to_json(&self) -> String {
        Value::Object(self.values()).to_string()
    }

    pub fn subscribe<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(event, listener)
    }

    pub fn publish(&self, event: &str, payload: impl Into<String>) {
        self.inner.events.publish(event, payload);
    }

    pub fn unsubscribe(&self, id: &ListenerId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    pub fn unsubscribe_all(&self, event: &str) -> usize {
        self.inner.events.unsubscribe_all(event)
    }

    pub(crate) fn mark_saved(&self) {
        self.inner.dirty.store(false, Ordering::SeqCst);
        self.publish(LifecycleEvent::Save.as_str(), self.to_json());
    }

    pub(crate) fn mark_deleted(&self) {
        self.inner.deleted.store(true, Ordering::SeqCst);
        self.publish(LifecycleEvent::Delete.as_str(), self.to_json());
    }

    fn read(&self) -> RwLockReadGuard<'_, Values> {
        self.inner
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("model", &self.inner.model)
            .field("values", &*self.read())
            .field("dirty", &self.is_dirty())
            .field("deleted", &self.is_deleted())
            .finish()
    }
}

/// Target of a save or delete: a tracked instance or raw, untracked values.
#[derive(Debug, Clone)]
pub enum Record {
    Instance(Instance),
    Values(Values),
}

impl Record {
    /// The tracked instance, if this is one.
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Record::Instance(instance) => Some(instance),
            Record::Values(_) => None,
        }
    }

    pub fn values(&self) -> Values {
        match self {
            Record::Instance(instance) => instance.values(),
            Record::Values(values) => values.clone(),
        }
    }

    pub fn id(&self) -> Option<Value> {
        match self {
            Record::Instance(instance) => instance.id(),
            Record::Values(values) => values.get(ID_FIELD).filter(|id| !id.is_null()).cloned(),
        }
    }
}

impl From<Instance> for Record {
    fn from(instance: Instance) -> Self {
        Record::Instance(instance)
    }
}

impl From<&Instance> for Record {
    fn from(instance: &Instance) -> Self {
        Record::Instance(instance.clone())
    }
}

impl From<Values> for Record {
    fn from(values: Values) -> Self {
        Record::Values(values)
    }
}
