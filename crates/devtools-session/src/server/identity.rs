//! Identity keys for notifications
//!
//! A notification that answers a command carries no request id. It is matched
//! instead by an identity key built from the notification type's declared
//! fields: `"<type>:<field1>=<value1>,<field2>=<value2>"`, in declared order.
//! Values are written as compact JSON, so string values keep their quotes.
//! The same key can be built from the notification body (on arrival) or from
//! the command's ack result (before waiting), because correlated pairs share
//! those field values.

use crate::error::{Error, Result};
use crate::protocol::{IdentityField, NotificationType};
use serde_json::{Map, Value};
use std::fmt;

/// Canonical identity of a notification instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the key from a notification body
pub fn hash_from_event(kind: &NotificationType, body: &Value) -> Result<IdentityKey> {
    build(kind, |field| field.locate(body))
}

/// Builds the key a command's awaited notification will carry, from the
/// command's ack result
pub fn hash_from_ack_result(
    kind: &NotificationType,
    result: &Map<String, Value>,
) -> Result<IdentityKey> {
    build(kind, |field| result.get(field.name))
}

fn build<'v>(
    kind: &NotificationType,
    lookup: impl Fn(&IdentityField) -> Option<&'v Value>,
) -> Result<IdentityKey> {
    if !kind.is_identity_bearing() {
        return Err(Error::UnhashableType(kind.name().to_string()));
    }

    let mut parts = Vec::with_capacity(kind.identity_fields().len());
    for field in kind.identity_fields() {
        let value = lookup(field).ok_or_else(|| Error::MissingIdentityField {
            notification: kind.name().to_string(),
            field: field.name.to_string(),
        })?;
        parts.push(format!("{}={}", field.name, render(value)));
    }

    let key = format!("{}:{}", kind.name(), parts.join(","));
    tracing::trace!(key = %key, "generated identity key");
    Ok(IdentityKey(key))
}

// Compact JSON for every value: strings keep their quotes and escapes, so
// "7" and 7 differ and no value can forge a field separator.
fn render(value: &Value) -> String {
    value.to_string()
}
