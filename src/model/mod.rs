//! Models - schema-bearing orchestrators between application code and a connector.
//!
//! A Model holds a name, a field schema and a connector. It translates CRUD
//! calls into connector calls and updates instance lifecycle state from the
//! results.
//!
//! ## Example
//!
//! ```ignore
//! use arrow_orm::{Field, InMemoryConnector, Model, ModelDefinition};
//!
//! let user = Model::define(
//!     "user",
//!     ModelDefinition::new()
//!         .field("name", Field::string().required())
//!         .with_connector(Arc::new(InMemoryConnector::new())),
//! )?;
//!
//! user.create(values, |result| {
//!     let instance = result?;
//!     // ...
//! });
//! ```

mod crud;
mod definition;
mod field;
mod query;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::connector::Connector;
use crate::error::ModelError;
use crate::instance::{Instance, Values};
use crate::request::{Request, Session};

pub use definition::{Action, ModelDefinition, ModelOptions};
pub use field::{Field, FieldType, Fields, ID_FIELD};
pub use query::{Found, Query};

/// Argument to [`Model::extend`]: another model, or a definition to wrap first.
pub enum Extension {
    Model(Model),
    Definition {
        name: String,
        definition: ModelDefinition,
    },
}

impl From<Model> for Extension {
    fn from(model: Model) -> Self {
        Extension::Model(model)
    }
}

impl From<&Model> for Extension {
    fn from(model: &Model) -> Self {
        Extension::Model(model.clone())
    }
}

impl<N: Into<String>> From<(N, ModelDefinition)> for Extension {
    fn from((name, definition): (N, ModelDefinition)) -> Self {
        Extension::Definition {
            name: name.into(),
            definition,
        }
    }
}

/// A model: name, field schema and the connector it delegates to.
///
/// Cloning is cheap; clones share the schema and connector.
#[derive(Clone)]
pub struct Model {
    name: String,
    fields: Arc<Fields>,
    connector: Option<Arc<dyn Connector>>,
    login: Option<Session>,
    options: ModelOptions,
}

impl Model {
    /// Build a model from a definition.
    ///
    /// Fails with [`ModelError::Definition`] when the connector or fields are
    /// missing, and with [`ModelError::Validation`] when the schema defines `id`.
    pub fn define(name: impl Into<String>, definition: ModelDefinition) -> Result<Model, ModelError> {
        let name = name.into();
        if definition.connector.is_none() {
            return Err(ModelError::Definition(format!(
                "model {} is missing required connector",
                name
            )));
        }
        if definition.fields.is_empty() {
            return Err(ModelError::Definition(format!(
                "model {} is missing required fields",
                name
            )));
        }
        check_schema(&definition.fields)?;
        Ok(Self::unchecked(name, definition))
    }

    /// Build a model without validating the definition.
    pub(crate) fn unchecked(name: impl Into<String>, definition: ModelDefinition) -> Model {
        Model {
            name: name.into(),
            fields: Arc::new(definition.fields),
            connector: definition.connector,
            login: None,
            options: definition.options,
        }
    }

    /// A new model with this model's schema merged with `extension`.
    ///
    /// The argument's fields win on conflict; its name, connector and
    /// metadata win when set. A definition argument is schema-checked first
    /// but may omit the connector, which is then inherited.
    pub fn extend(&self, extension: impl Into<Extension>) -> Result<Model, ModelError> {
        let other = match extension.into() {
            Extension::Model(model) => model,
            Extension::Definition { name, definition } => {
                check_schema(&definition.fields)?;
                Model::unchecked(name, definition)
            }
        };
        Ok(self.merged(&other))
    }

    fn merged(&self, other: &Model) -> Model {
        let mut fields = Fields::clone(&self.fields);
        for (name, field) in other.fields.iter() {
            fields.insert(name.clone(), field.clone());
        }
        Model {
            name: other.name.clone(),
            fields: Arc::new(fields),
            connector: other.connector.clone().or_else(|| self.connector.clone()),
            login: other.login.clone().or_else(|| self.login.clone()),
            options: self.options.merged(&other.options),
        }
    }

    /// A model sharing this schema, bound to a connector scoped to `request`.
    ///
    /// The scoped connector's login context is carried on the new model.
    pub fn create_request(&self, request: &Request) -> Result<Model, ModelError> {
        let connector = self.bound_connector()?.create_request(request);
        let login = connector.login();
        tracing::debug!(
            model = %self.name,
            request = request.id().unwrap_or("-"),
            "created request-scoped model"
        );
        Ok(Model {
            name: self.name.clone(),
            fields: Arc::clone(&self.fields),
            connector: Some(connector),
            login,
            options: self.options.clone(),
        })
    }

    /// A new, unsaved instance of this model. Missing fields take their defaults.
    pub fn instance(&self, mut values: Values) -> Instance {
        for (name, field) in self.fields.iter() {
            if let Some(default) = &field.default {
                if !values.contains_key(name) {
                    values.insert(name.clone(), default.clone());
                }
            }
        }
        Instance::new(self.name.clone(), values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn connector(&self) -> Option<&Arc<dyn Connector>> {
        self.connector.as_ref()
    }

    /// Login context of a request-scoped model.
    pub fn login(&self) -> Option<&Session> {
        self.login.as_ref()
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Plural name; defaults to the name with an `s` appended.
    pub fn plural(&self) -> String {
        self.options
            .plural
            .clone()
            .unwrap_or_else(|| format!("{}s", self.name))
    }

    pub fn singular(&self) -> &str {
        self.options.singular.as_deref().unwrap_or(&self.name)
    }

    pub fn description(&self) -> Option<&str> {
        self.options.description.as_deref()
    }

    /// Supported actions; all of them unless restricted.
    pub fn actions(&self) -> Vec<Action> {
        self.options
            .actions
            .clone()
            .unwrap_or_else(|| Action::ALL.to_vec())
    }

    pub fn supports(&self, action: Action) -> bool {
        self.actions().contains(&action)
    }

    pub fn autogen(&self) -> bool {
        self.options.autogen.unwrap_or(true)
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.options.metadata.as_ref()
    }

    pub(crate) fn bound_connector(&self) -> Result<Arc<dyn Connector>, ModelError> {
        self.connector.clone().ok_or_else(|| {
            ModelError::Definition(format!("model {} is missing required connector", self.name))
        })
    }
}

fn check_schema(fields: &Fields) -> Result<(), ModelError> {
    if fields.contains_key(ID_FIELD) {
        return Err(ModelError::Validation {
            field: ID_FIELD.to_string(),
            message: "id is a reserved field name for the generated primary key".to_string(),
        });
    }
    Ok(())
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("connector", &self.connector.as_ref().map(|c| c.name().to_string()))
            .field("login", &self.login)
            .finish()
    }
}
