mod collection;
mod connector;
mod error;
mod events;
mod instance;
mod model;
mod registry;
mod request;

pub use collection::Collection;
pub use connector::{Callback, Connector, InMemoryConnector};
pub use error::ModelError;
pub use events::{Events, LifecycleEvent, ListenerId};
pub use instance::{Instance, Record, Values};
pub use model::{
    Action, Extension, Field, FieldType, Fields, Found, Model, ModelDefinition, ModelOptions,
    Query, ID_FIELD,
};
pub use registry::ModelRegistry;
pub use request::{Request, Session};
