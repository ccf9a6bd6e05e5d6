//! InMemoryConnector - HashMap-backed connector for testing and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::{Callback, Connector};
use crate::collection::Collection;
use crate::error::ModelError;
use crate::instance::{Instance, Record, Values};
use crate::model::{Model, ID_FIELD};
use crate::request::{Request, Session};

/// Internal stored representation of a record.
struct StoredRecord {
    values: Values,
    version: u64,
    // insertion sequence, keeps find results in creation order
    seq: u64,
}

/// In-memory connector backed by a HashMap.
///
/// Storage key is `"model:id"`. Ids are generated sequentially. Clones and
/// request-scoped connectors share the same storage. Every operation calls
/// back before returning.
#[derive(Clone)]
pub struct InMemoryConnector {
    storage: Arc<RwLock<HashMap<String, StoredRecord>>>,
    next_id: Arc<AtomicU64>,
    session: Option<Session>,
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            session: None,
        }
    }

    /// Number of records stored for `model`.
    pub fn count(&self, model: &str) -> usize {
        let prefix = format!("{}:", model);
        self.read()
            .map(|storage| storage.keys().filter(|key| key.starts_with(&prefix)).count())
            .unwrap_or(0)
    }

    /// Stored version of a record; bumps on every save.
    pub fn version(&self, model: &str, id: &Value) -> Option<u64> {
        let key = Self::make_key(model, id);
        self.read().ok()?.get(&key).map(|stored| stored.version)
    }

    fn make_key(model: &str, id: &Value) -> String {
        match id {
            Value::String(id) => format!("{}:{}", model, id),
            other => format!("{}:{}", model, other),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredRecord>>, ModelError> {
        self.storage
            .read()
            .map_err(|_| ModelError::Connector("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredRecord>>, ModelError> {
        self.storage
            .write()
            .map_err(|_| ModelError::Connector("lock poisoned".into()))
    }

    fn insert(&self, model: &Model, mut values: Values) -> Result<Instance, ModelError> {
        // lock first so a poisoned store never consumes an id
        let mut storage = self.write()?;
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = Value::from(seq.to_string());
        values.insert(ID_FIELD.to_string(), id.clone());

        storage.insert(
            Self::make_key(model.name(), &id),
            StoredRecord {
                values: values.clone(),
                version: 1,
                seq,
            },
        );
        drop(storage);
        Ok(Instance::stored(model.name(), values))
    }

    fn update(&self, model: &Model, record: &Record) -> Result<Option<Instance>, ModelError> {
        let id = record.id().ok_or_else(|| {
            ModelError::Connector(format!("cannot save a {} record without an id", model.name()))
        })?;
        let key = Self::make_key(model.name(), &id);
        let values = record.values();

        let mut storage = self.write()?;
        let stored = storage.get_mut(&key).ok_or_else(|| {
            ModelError::Connector(format!("{} record {} not found", model.name(), id))
        })?;
        stored.values = values.clone();
        stored.version += 1;
        drop(storage);

        // Tracked instances come back as themselves so callers see the new flags.
        Ok(Some(match record {
            Record::Instance(instance) => instance.clone(),
            Record::Values(_) => Instance::stored(model.name(), values),
        }))
    }

    fn remove(&self, model: &Model, record: &Record) -> Result<Option<Instance>, ModelError> {
        let Some(id) = record.id() else {
            return Ok(None);
        };
        let key = Self::make_key(model.name(), &id);
        let removed = self.write()?.remove(&key);

        Ok(removed.map(|stored| match record {
            Record::Instance(instance) => instance.clone(),
            Record::Values(_) => Instance::stored(model.name(), stored.values),
        }))
    }

    fn select(
        &self,
        model: &Model,
        predicate: &dyn Fn(&Values) -> bool,
    ) -> Result<Collection, ModelError> {
        let prefix = format!("{}:", model.name());
        let storage = self.read()?;

        let mut matches: Vec<&StoredRecord> = storage
            .iter()
            .filter(|(key, stored)| key.starts_with(&prefix) && predicate(&stored.values))
            .map(|(_, stored)| stored)
            .collect();
        matches.sort_by_key(|stored| stored.seq);

        let items = matches
            .into_iter()
            .map(|stored| Instance::stored(model.name(), stored.values.clone()))
            .collect();
        Ok(Collection::new(model.name(), items))
    }
}

impl Connector for InMemoryConnector {
    fn name(&self) -> &str {
        "memory"
    }

    fn create(
        &self,
        model: &Model,
        values: Values,
        callback: Callback<Instance>,
    ) -> Result<(), ModelError> {
        if values.contains_key(ID_FIELD) {
            return Err(ModelError::Validation {
                field: ID_FIELD.to_string(),
                message: "id is generated by the connector".to_string(),
            });
        }
        callback(self.insert(model, values));
        Ok(())
    }

    fn save(&self, model: &Model, record: Record, callback: Callback<Option<Instance>>) {
        callback(self.update(model, &record));
    }

    fn delete(&self, model: &Model, record: Record, callback: Callback<Option<Instance>>) {
        callback(self.remove(model, &record));
    }

    fn delete_all(&self, model: &Model, callback: Callback<usize>) {
        let prefix = format!("{}:", model.name());
        let result = self.write().map(|mut storage| {
            let before = storage.len();
            storage.retain(|key, _| !key.starts_with(&prefix));
            before - storage.len()
        });
        callback(result);
    }

    fn find_one(&self, model: &Model, id: &Value, callback: Callback<Option<Instance>>) {
        let key = Self::make_key(model.name(), id);
        let result = self.read().map(|storage| {
            storage
                .get(&key)
                .map(|stored| Instance::stored(model.name(), stored.values.clone()))
        });
        callback(result);
    }

    fn find_all(&self, model: &Model, callback: Callback<Collection>) {
        callback(self.select(model, &|_| true));
    }

    fn find(&self, model: &Model, constraints: &Values, callback: Callback<Collection>) {
        callback(self.select(model, &|values| {
            constraints
                .iter()
                .all(|(field, expected)| values.get(field) == Some(expected))
        }));
    }

    fn create_request(&self, request: &Request) -> Arc<dyn Connector> {
        let session = request.session().clone();
        Arc::new(InMemoryConnector {
            storage: Arc::clone(&self.storage),
            next_id: Arc::clone(&self.next_id),
            session: (!session.is_empty()).then_some(session),
        })
    }

    fn login(&self) -> Option<Session> {
        self.session.clone()
    }
}
