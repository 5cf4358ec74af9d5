// Result schemas
//
// A command may declare the shape of its ack result as a flat list of fields.
// One generic validator interprets that description: every required field must
// be present, every present field must have its declared JSON type, and no
// field outside the declaration may appear.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;

/// JSON type a result field is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Integral JSON number
    Integer,
    /// Any JSON number, integral or not
    Number,
    Boolean,
    Object,
    Array,
    /// Accept any value
    Any,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Object => value.is_object(),
            FieldKind::Array => value.is_array(),
            FieldKind::Any => true,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
            FieldKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// One declared result field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub optional: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            optional: true,
        }
    }
}

/// Declared shape of a command's ack result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    fields: &'static [FieldSpec],
}

impl Schema {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks `result` against this schema.
    ///
    /// A `null` value for an optional field counts as absent. Errors name the
    /// offending field, the expected type and what was actually found.
    pub fn validate(&self, method: &str, result: &Map<String, Value>) -> Result<()> {
        for (name, value) in result {
            let Some(spec) = self.field(name) else {
                return Err(validation_error(
                    method,
                    name,
                    "no such field (undeclared)".to_string(),
                    describe(value),
                ));
            };
            if value.is_null() && spec.optional {
                continue;
            }
            if !spec.kind.accepts(value) {
                return Err(validation_error(
                    method,
                    name,
                    spec.kind.to_string(),
                    describe(value),
                ));
            }
        }

        if let Some(missing) = self
            .fields
            .iter()
            .find(|f| !f.optional && !result.contains_key(f.name))
        {
            return Err(validation_error(
                method,
                missing.name,
                missing.kind.to_string(),
                "nothing (field missing)".to_string(),
            ));
        }

        Ok(())
    }
}

fn validation_error(method: &str, field: &str, expected: String, actual: String) -> Error {
    Error::ValidationError {
        method: method.to_string(),
        field: field.to_string(),
        expected,
        actual,
    }
}

fn describe(value: &Value) -> String {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("{value} ({kind})")
}
