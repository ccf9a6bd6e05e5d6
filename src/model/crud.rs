//! CRUD dispatch: how model calls become connector calls, and how results
//! update instance lifecycle state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{Found, Model, Query};
use crate::collection::Collection;
use crate::connector::Callback;
use crate::error::ModelError;
use crate::instance::{Instance, Record, Values};

impl Model {
    /// Create one record through the connector.
    ///
    /// A synchronous rejection from the connector is delivered to `callback`
    /// like any other connector error.
    pub fn create<F>(&self, values: Values, callback: F)
    where
        F: FnOnce(Result<Instance, ModelError>) + Send + 'static,
    {
        self.create_one(values, Box::new(callback));
    }

    /// Create records one after another, in order.
    ///
    /// Record `i + 1` is not attempted until record `i` has completed. On
    /// success the collection holds the created records in input order. The
    /// first failure stops the batch and is reported as [`ModelError::Batch`]
    /// carrying the failing index and the connector's error.
    pub fn create_many<F>(&self, values: Vec<Values>, callback: F)
    where
        F: FnOnce(Result<Collection, ModelError>) + Send + 'static,
    {
        tracing::debug!(model = %self.name, count = values.len(), "batch create");
        drive(BatchCreate {
            model: self.clone(),
            pending: values.into_iter(),
            created: Vec::new(),
            done: Box::new(callback),
        });
    }

    fn create_one(&self, values: Values, callback: Callback<Instance>) {
        let connector = match self.bound_connector() {
            Ok(connector) => connector,
            Err(err) => return callback(Err(err)),
        };
        tracing::debug!(model = %self.name, connector = connector.name(), "create");

        // The callback may be consumed by the connector or by a sync rejection, never both.
        let slot = Arc::new(Mutex::new(Some(callback)));
        let pending = Arc::clone(&slot);
        let forward: Callback<Instance> = Box::new(move |result| {
            if let Some(callback) = take(&pending) {
                callback(result);
            }
        });

        if let Err(err) = connector.create(self, values, forward) {
            match take(&slot) {
                Some(callback) => callback(Err(err)),
                None => tracing::warn!(
                    model = %self.name,
                    error = %err,
                    "connector rejected create after completing it"
                ),
            }
        }
    }

    /// Persist a record.
    ///
    /// Deleted instances fail with [`ModelError::AlreadyDeleted`]; clean
    /// tracked instances complete with `Ok(None)` without reaching the
    /// connector. Otherwise the saved record is marked clean and publishes
    /// `save` before `callback` runs.
    pub fn save<F>(&self, record: impl Into<Record>, callback: F)
    where
        F: FnOnce(Result<Option<Instance>, ModelError>) + Send + 'static,
    {
        let record = record.into();
        if let Some(instance) = record.instance() {
            if instance.is_deleted() {
                tracing::warn!(model = %self.name, "save rejected, instance already deleted");
                return callback(Err(self.already_deleted()));
            }
            if !instance.is_dirty() {
                tracing::debug!(model = %self.name, "save skipped, instance is clean");
                return callback(Ok(None));
            }
        }

        let connector = match self.bound_connector() {
            Ok(connector) => connector,
            Err(err) => return callback(Err(err)),
        };
        tracing::debug!(model = %self.name, connector = connector.name(), "save");
        connector.save(
            self,
            record,
            Box::new(move |result| {
                if let Ok(Some(saved)) = &result {
                    saved.mark_saved();
                }
                callback(result);
            }),
        );
    }

    /// Alias of [`Model::save`].
    pub fn update<F>(&self, record: impl Into<Record>, callback: F)
    where
        F: FnOnce(Result<Option<Instance>, ModelError>) + Send + 'static,
    {
        self.save(record, callback);
    }

    /// Delete a record.
    ///
    /// A tracked instance that is already deleted fails with
    /// [`ModelError::AlreadyDeleted`] without reaching the connector. When
    /// the connector reports a deleted record it is flagged and publishes
    /// `delete` before `callback` runs.
    pub fn delete<F>(&self, record: impl Into<Record>, callback: F)
    where
        F: FnOnce(Result<Option<Instance>, ModelError>) + Send + 'static,
    {
        let record = record.into();
        if record.instance().is_some_and(Instance::is_deleted) {
            tracing::warn!(model = %self.name, "delete rejected, instance already deleted");
            return callback(Err(self.already_deleted()));
        }

        let connector = match self.bound_connector() {
            Ok(connector) => connector,
            Err(err) => return callback(Err(err)),
        };
        tracing::debug!(model = %self.name, connector = connector.name(), "delete");
        connector.delete(
            self,
            record,
            Box::new(move |result| {
                if let Ok(Some(deleted)) = &result {
                    deleted.mark_deleted();
                }
                callback(result);
            }),
        );
    }

    /// Alias of [`Model::delete`].
    pub fn remove<F>(&self, record: impl Into<Record>, callback: F)
    where
        F: FnOnce(Result<Option<Instance>, ModelError>) + Send + 'static,
    {
        self.delete(record, callback);
    }

    /// Delete every record of the model.
    ///
    /// Instances already held by callers keep their flags.
    pub fn delete_all<F>(&self, callback: F)
    where
        F: FnOnce(Result<usize, ModelError>) + Send + 'static,
    {
        match self.bound_connector() {
            Ok(connector) => connector.delete_all(self, Box::new(callback)),
            Err(err) => callback(Err(err)),
        }
    }

    /// Alias of [`Model::delete_all`].
    pub fn remove_all<F>(&self, callback: F)
    where
        F: FnOnce(Result<usize, ModelError>) + Send + 'static,
    {
        self.delete_all(callback);
    }

    /// Fetch one record by primary key.
    pub fn find_one<F>(&self, id: impl Into<Value>, callback: F)
    where
        F: FnOnce(Result<Option<Instance>, ModelError>) + Send + 'static,
    {
        let id = id.into();
        match self.bound_connector() {
            Ok(connector) => connector.find_one(self, &id, Box::new(callback)),
            Err(err) => callback(Err(err)),
        }
    }

    /// Fetch every record.
    pub fn find_all<F>(&self, callback: F)
    where
        F: FnOnce(Result<Collection, ModelError>) + Send + 'static,
    {
        match self.bound_connector() {
            Ok(connector) => connector.find_all(self, Box::new(callback)),
            Err(err) => callback(Err(err)),
        }
    }

    /// Fetch records matching every constraint.
    pub fn find_by<F>(&self, constraints: Values, callback: F)
    where
        F: FnOnce(Result<Collection, ModelError>) + Send + 'static,
    {
        match self.bound_connector() {
            Ok(connector) => connector.find(self, &constraints, Box::new(callback)),
            Err(err) => callback(Err(err)),
        }
    }

    /// Run a query: key lookup, constraint match, or everything.
    pub fn find<F>(&self, query: impl Into<Query>, callback: F)
    where
        F: FnOnce(Result<Found, ModelError>) + Send + 'static,
    {
        match query.into() {
            Query::ById(id) => {
                self.find_one(id, move |result| callback(result.map(Found::One)))
            }
            Query::ByConstraints(constraints) => {
                self.find_by(constraints, move |result| callback(result.map(Found::Many)))
            }
            Query::All => self.find_all(move |result| callback(result.map(Found::Many))),
        }
    }

    /// Alias of [`Model::find`].
    pub fn fetch<F>(&self, query: impl Into<Query>, callback: F)
    where
        F: FnOnce(Result<Found, ModelError>) + Send + 'static,
    {
        self.find(query, callback);
    }

    fn already_deleted(&self) -> ModelError {
        ModelError::AlreadyDeleted {
            model: self.name.clone(),
        }
    }
}

/// State of a running batch create.
struct BatchCreate {
    model: Model,
    pending: std::vec::IntoIter<Values>,
    created: Vec<Instance>,
    done: Callback<Collection>,
}

/// Handoff between the batch driver and one item's completion.
enum Step {
    /// `create` has not returned and the item has not completed.
    Running,
    /// The item completed before `create` returned.
    Ready(Result<Instance, ModelError>),
    /// `create` returned first; the completion resumes the batch.
    Parked(BatchCreate),
}

/// Drive a batch until it finishes or an item completes later than its
/// `create` call. Items that complete inline are handled by the loop, so
/// stack depth does not grow with the batch size.
fn drive(mut batch: BatchCreate) {
    loop {
        let Some(values) = batch.pending.next() else {
            let BatchCreate { model, created, done, .. } = batch;
            return done(Ok(Collection::new(model.name.clone(), created)));
        };
        let index = batch.created.len();

        let step = Arc::new(Mutex::new(Step::Running));
        let handoff = Arc::clone(&step);
        batch.model.create_one(
            values,
            Box::new(move |result| {
                let mut guard = lock(&handoff);
                match std::mem::replace(&mut *guard, Step::Running) {
                    Step::Parked(batch) => {
                        drop(guard);
                        if let Some(batch) = settle(batch, index, result) {
                            drive(batch);
                        }
                    }
                    _ => *guard = Step::Ready(result),
                }
            }),
        );

        let mut guard = lock(&step);
        match std::mem::replace(&mut *guard, Step::Running) {
            Step::Ready(result) => {
                drop(guard);
                match settle(batch, index, result) {
                    Some(next) => batch = next,
                    None => return,
                }
            }
            _ => {
                *guard = Step::Parked(batch);
                return;
            }
        }
    }
}

/// Record one item's outcome. Returns the batch if it should continue.
fn settle(
    mut batch: BatchCreate,
    index: usize,
    result: Result<Instance, ModelError>,
) -> Option<BatchCreate> {
    match result {
        Ok(instance) => {
            batch.created.push(instance);
            Some(batch)
        }
        Err(err) => {
            tracing::warn!(model = %batch.model.name, index, error = %err, "batch create stopped");
            (batch.done)(Err(ModelError::batch(index, err)));
            None
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    lock(slot).take()
}
