// Command descriptors
//
// A command is pure data: the wire method name, its parameter map, and an
// optional declared result shape. The session never inspects the parameters.

use crate::protocol::schema::Schema;
use serde::Serialize;
use serde_json::{Map, Value};

/// A protocol command ready to be issued on a session
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    method: String,
    params: Map<String, Value>,
    result_schema: Option<Schema>,
}

impl Command {
    /// Creates a command with no parameters, e.g. `Command::new("Page.enable")`
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Map::new(),
            result_schema: None,
        }
    }

    /// Creates a command whose parameters are the serialized fields of `params`.
    ///
    /// `params` must serialize to a JSON object; `None` fields should be skipped
    /// with `#[serde(skip_serializing_if = "Option::is_none")]`.
    pub fn with_params<P: Serialize>(
        method: impl Into<String>,
        params: &P,
    ) -> crate::Result<Self> {
        let method = method.into();
        match serde_json::to_value(params)? {
            Value::Object(params) => Ok(Self {
                method,
                params,
                result_schema: None,
            }),
            Value::Null => Ok(Self::new(method)),
            other => Err(crate::Error::InvalidArgument(format!(
                "parameters for {method} must be an object, got {other}"
            ))),
        }
    }

    /// Adds a parameter
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Adds a parameter only when `value` is `Some`; absent optionals never
    /// reach the wire as `null`.
    pub fn optional_param<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Declares the shape the ack result must have
    pub fn returns(mut self, schema: Schema) -> Self {
        self.result_schema = Some(schema);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn result_schema(&self) -> Option<&Schema> {
        self.result_schema.as_ref()
    }
}
