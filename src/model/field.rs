//! Field descriptors making up a model's schema.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name reserved for the generated primary key.
pub const ID_FIELD: &str = "id";

/// Schema of a model: field name to descriptor, in declaration order.
pub type Fields = IndexMap<String, Field>;

/// Value type of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Object,
    Array,
    Any,
}

/// One field in a model's schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    pub readonly: bool,
    /// Field does not exist in the connector's data source.
    pub custom: bool,
    pub description: Option<String>,
    /// Column/property name in the data source, when it differs.
    pub name: Option<String>,
    pub maxlength: Option<usize>,
    /// Related model name (`connector/model` or a custom model).
    pub model: Option<String>,
}

impl Field {
    pub fn new(field_type: FieldType) -> Self {
        Field {
            field_type,
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_column(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_maxlength(mut self, maxlength: usize) -> Self {
        self.maxlength = Some(maxlength);
        self
    }

    /// Name of the field in the data source.
    pub fn column<'a>(&'a self, field: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(field)
    }
}
