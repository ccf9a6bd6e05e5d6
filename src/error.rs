use thiserror::Error;

/// Error type for model construction and model operations.
///
/// Definition and validation errors are returned synchronously when a Model
/// is built. Everything else is delivered through an operation's callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The model definition is missing something it needs (connector, fields).
    #[error("model definition error: {0}")]
    Definition(String),
    /// A field in the schema is not allowed.
    #[error("validation failed for field {field}: {message}")]
    Validation { field: String, message: String },
    /// Save or delete attempted on an instance that was already deleted.
    #[error("instance of {model} has already been deleted")]
    AlreadyDeleted { model: String },
    /// Error reported by a connector. Forwarded to callers unchanged.
    #[error("connector error: {0}")]
    Connector(String),
    /// A model definition could not be decoded.
    #[error("invalid model configuration: {0}")]
    Config(String),
    /// A batch create stopped at `index`; `source` is the error that stopped it.
    #[error("batch create failed at index {index}: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<ModelError>,
    },
}

impl ModelError {
    pub(crate) fn batch(index: usize, source: ModelError) -> Self {
        ModelError::Batch {
            index,
            source: Box::new(source),
        }
    }

    /// Index of the failing payload, for batch failures.
    pub fn index(&self) -> Option<usize> {
        match self {
            ModelError::Batch { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The error with any batch annotation removed.
    pub fn root(&self) -> &ModelError {
        match self {
            ModelError::Batch { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for lifecycle errors (operations on deleted instances).
    pub fn is_lifecycle(&self) -> bool {
        matches!(self.root(), ModelError::AlreadyDeleted { .. })
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Config(err.to_string())
    }
}
