//! Collection - ordered result set of instances with its own event capability.

use std::fmt;
use std::ops::{Deref, Index};

use serde::{Serialize, Serializer};

use crate::events::{Events, ListenerId};
use crate::instance::Instance;

/// Ordered instances returned by multi-record operations.
///
/// Order is creation/result order. Indexing and iteration go straight to the
/// underlying sequence; serialization renders the sequence, not the wrapper.
pub struct Collection {
    model: String,
    items: Vec<Instance>,
    events: Events,
}

impl Collection {
    pub fn new(model: impl Into<String>, items: Vec<Instance>) -> Self {
        Collection {
            model: model.into(),
            items,
            events: Events::new(),
        }
    }

    pub fn empty(model: impl Into<String>) -> Self {
        Self::new(model, Vec::new())
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Truncate the underlying sequence to `len` elements. `0` clears it.
    ///
    /// A length at or beyond the current one leaves the collection unchanged.
    pub fn set_len(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Instance> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Instance] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Instance> {
        self.items
    }

    /// The sequence as compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.items).unwrap_or_else(|_| String::from("[]"))
    }

    pub fn subscribe<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.events.subscribe(event, listener)
    }

    pub fn publish(&self, event: &str, payload: impl Into<String>) {
        self.events.publish(event, payload);
    }

    pub fn unsubscribe(&self, id: &ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn unsubscribe_all(&self, event: &str) -> usize {
        self.events.unsubscribe_all(event)
    }
}

impl Deref for Collection {
    type Target = [Instance];

    fn deref(&self) -> &[Instance] {
        &self.items
    }
}

impl Index<usize> for Collection {
    type Output = Instance;

    fn index(&self, index: usize) -> &Instance {
        &self.items[index]
    }
}

impl IntoIterator for Collection {
    type Item = Instance;
    type IntoIter = std::vec::IntoIter<Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
