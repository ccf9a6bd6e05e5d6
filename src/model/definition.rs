//! Model definitions: the schema, connector and metadata a Model is built from.
//!
//! Definitions can be written in code or loaded from JSON. The connector is
//! never part of the JSON; attach it with [`ModelDefinition::with_connector`].
//!
//! ```ignore
//! let definition = ModelDefinition::from_json(r#"{
//!     "fields": {
//!         "first_name": { "type": "string", "required": true },
//!         "last_name": { "type": "string" }
//!     },
//!     "plural": "people"
//! }"#)?
//! .with_connector(connector);
//! let person = Model::define("person", definition)?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::field::{Field, Fields};
use crate::connector::Connector;
use crate::error::ModelError;

/// Data operations a model can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];
}

/// Optional model metadata. Unset values fall back to defaults on the Model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelOptions {
    pub plural: Option<String>,
    pub singular: Option<String>,
    pub description: Option<String>,
    pub actions: Option<Vec<Action>>,
    pub autogen: Option<bool>,
    /// Connector-specific configuration (table mapping, joins, ...).
    pub metadata: Option<Value>,
}

impl ModelOptions {
    /// Overlay `other` onto `self`; values set in `other` win.
    pub(crate) fn merged(&self, other: &ModelOptions) -> ModelOptions {
        ModelOptions {
            plural: other.plural.clone().or_else(|| self.plural.clone()),
            singular: other.singular.clone().or_else(|| self.singular.clone()),
            description: other
                .description
                .clone()
                .or_else(|| self.description.clone()),
            actions: other.actions.clone().or_else(|| self.actions.clone()),
            autogen: other.autogen.or(self.autogen),
            metadata: other.metadata.clone().or_else(|| self.metadata.clone()),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DefinitionConfig {
    fields: Fields,
    plural: Option<String>,
    singular: Option<String>,
    description: Option<String>,
    actions: Option<Vec<Action>>,
    autogen: Option<bool>,
    metadata: Option<Value>,
}

/// Everything needed to build a Model.
#[derive(Clone, Default)]
pub struct ModelDefinition {
    pub fields: Fields,
    pub connector: Option<Arc<dyn Connector>>,
    pub options: ModelOptions,
}

impl ModelDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a definition from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let config: DefinitionConfig = serde_json::from_str(text)?;
        Ok(config.into_definition())
    }

    /// Decode a definition from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        let config: DefinitionConfig = serde_json::from_value(value)?;
        Ok(config.into_definition())
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn plural(mut self, plural: impl Into<String>) -> Self {
        self.options.plural = Some(plural.into());
        self
    }

    pub fn singular(mut self, singular: impl Into<String>) -> Self {
        self.options.singular = Some(singular.into());
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.options.actions = Some(actions.into_iter().collect());
        self
    }
}

impl DefinitionConfig {
    fn into_definition(self) -> ModelDefinition {
        ModelDefinition {
            fields: self.fields,
            connector: None,
            options: ModelOptions {
                plural: self.plural,
                singular: self.singular,
                description: self.description,
                actions: self.actions,
                autogen: self.autogen,
                metadata: self.metadata,
            },
        }
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("fields", &self.fields)
            .field("connector", &self.connector.as_ref().map(|c| c.name().to_string()))
            .field("options", &self.options)
            .finish()
    }
}
