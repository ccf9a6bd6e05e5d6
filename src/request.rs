//! Per-request context handed to connectors when a request-scoped model is made.

use std::collections::HashMap;

/// Login context of a request: string variables keyed by name.
///
/// A request-scoped connector reports it through `Connector::login`, and the
/// request-scoped model keeps a copy. `user-id` and `role` have accessors;
/// connectors may read any other key with [`Session::get`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session(HashMap<String, String>);

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get("user-id")
    }

    pub fn role(&self) -> Option<&str> {
        self.get("role")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a variable, replacing any earlier value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// True when nothing is logged in; connectors skip binding such sessions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An incoming request a connector can be scoped to.
#[derive(Debug, Clone, Default)]
pub struct Request {
    id: Option<String>,
    headers: HashMap<String, String>,
    session: Session,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a header. Header names are stored lowercased.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
