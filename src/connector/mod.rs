//! Connector - the data-source capability a Model delegates to.
//!
//! Every operation completes by invoking its callback exactly once, possibly
//! long after the call returned. A connector that never calls back stalls the
//! model operation that started it; the core adds no timeouts.

mod in_memory;

use std::sync::Arc;

use serde_json::Value;

use crate::collection::Collection;
use crate::error::ModelError;
use crate::instance::{Instance, Record, Values};
use crate::model::Model;
use crate::request::{Request, Session};

/// One-shot completion for an asynchronous operation.
pub type Callback<T> = Box<dyn FnOnce(Result<T, ModelError>) + Send + 'static>;

/// Data-source operations a Model delegates to.
pub trait Connector: Send + Sync {
    /// Name used in logs and debug output.
    fn name(&self) -> &str;

    /// Persist one record; the callback receives the created instance.
    ///
    /// Returning `Err` rejects the record synchronously; the model routes the
    /// error to the caller's callback. Do not also invoke `callback` then.
    fn create(
        &self,
        model: &Model,
        values: Values,
        callback: Callback<Instance>,
    ) -> Result<(), ModelError>;

    /// Persist mutations; the callback receives the updated instance, if any.
    fn save(&self, model: &Model, record: Record, callback: Callback<Option<Instance>>);

    /// Remove one record; `Some` signals the record was deleted.
    fn delete(&self, model: &Model, record: Record, callback: Callback<Option<Instance>>);

    /// Remove every record of the model; the callback receives the count.
    fn delete_all(&self, model: &Model, callback: Callback<usize>);

    /// Fetch by primary key.
    fn find_one(&self, model: &Model, id: &Value, callback: Callback<Option<Instance>>);

    /// Fetch every record of the model.
    fn find_all(&self, model: &Model, callback: Callback<Collection>);

    /// Fetch records matching every constraint.
    fn find(&self, model: &Model, constraints: &Values, callback: Callback<Collection>);

    /// A connector bound to `request`, used by request-scoped models.
    fn create_request(&self, request: &Request) -> Arc<dyn Connector>;

    /// Authentication context of a request-scoped connector.
    fn login(&self) -> Option<Session> {
        None
    }
}

pub use in_memory::InMemoryConnector;
