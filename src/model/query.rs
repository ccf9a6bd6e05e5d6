use serde_json::Value;

use crate::collection::Collection;
use crate::instance::{Instance, Values};

/// What a [`Model::find`](super::Model::find) call asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Primary-key lookup.
    ById(Value),
    /// Records whose values equal every constraint.
    ByConstraints(Values),
    /// Every record of the model.
    All,
}

impl Query {
    /// Route dynamically typed input: objects become constraints, anything
    /// else is treated as a primary key.
    pub fn from_value(value: Value) -> Query {
        match value {
            Value::Object(constraints) => Query::ByConstraints(constraints),
            id => Query::ById(id),
        }
    }
}

impl From<Values> for Query {
    fn from(constraints: Values) -> Self {
        Query::ByConstraints(constraints)
    }
}

impl From<&str> for Query {
    fn from(id: &str) -> Self {
        Query::ById(Value::from(id))
    }
}

impl From<String> for Query {
    fn from(id: String) -> Self {
        Query::ById(Value::from(id))
    }
}

impl From<i64> for Query {
    fn from(id: i64) -> Self {
        Query::ById(Value::from(id))
    }
}

impl From<i32> for Query {
    fn from(id: i32) -> Self {
        Query::ById(Value::from(id))
    }
}

impl From<u64> for Query {
    fn from(id: u64) -> Self {
        Query::ById(Value::from(id))
    }
}

impl From<()> for Query {
    fn from(_: ()) -> Self {
        Query::All
    }
}

/// Result of a find: one optional record for key lookups, a collection otherwise.
#[derive(Debug)]
pub enum Found {
    One(Option<Instance>),
    Many(Collection),
}

impl Found {
    pub fn one(&self) -> Option<&Instance> {
        match self {
            Found::One(instance) => instance.as_ref(),
            Found::Many(_) => None,
        }
    }

    pub fn many(&self) -> Option<&Collection> {
        match self {
            Found::Many(collection) => Some(collection),
            Found::One(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Found::One(instance) => usize::from(instance.is_some()),
            Found::Many(collection) => collection.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_instances(self) -> Vec<Instance> {
        match self {
            Found::One(instance) => instance.into_iter().collect(),
            Found::Many(collection) => collection.into_vec(),
        }
    }
}
