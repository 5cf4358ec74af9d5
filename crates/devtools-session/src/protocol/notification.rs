// Notification type descriptors
//
// Each notification type is data: its wire name and, if it can be tied back to
// the command that caused it, the ordered identity fields shared between that
// command's ack result and the notification body.

use serde_json::Value;
use std::collections::HashMap;

/// One identity field of a notification type.
///
/// `name` is the key in the command's ack result. The same value is read from
/// the notification body under `name`, or at `path` when the body nests it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityField {
    pub name: &'static str,
    path: Option<&'static [&'static str]>,
}

impl IdentityField {
    /// A field found under the same name in both the ack result and the body
    pub const fn flat(name: &'static str) -> Self {
        Self { name, path: None }
    }

    /// A field whose body value sits at a nested path (e.g. `frame.id`)
    pub const fn nested(name: &'static str, path: &'static [&'static str]) -> Self {
        Self {
            name,
            path: Some(path),
        }
    }

    /// Finds this field's value in a notification body
    pub fn locate<'v>(&self, body: &'v Value) -> Option<&'v Value> {
        match self.path {
            None => body.get(self.name),
            Some(path) => path.iter().try_fold(body, |value, segment| value.get(segment)),
        }
    }
}

/// Descriptor for one notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationType {
    name: &'static str,
    identity: Option<&'static [IdentityField]>,
}

impl NotificationType {
    /// A notification type that can be correlated with a command
    pub const fn identified(name: &'static str, fields: &'static [IdentityField]) -> Self {
        Self {
            name,
            identity: Some(fields),
        }
    }

    /// A broadcast with no stable identity; it can never be awaited
    pub const fn broadcast(name: &'static str) -> Self {
        Self {
            name,
            identity: None,
        }
    }

    /// Wire name, e.g. `Page.frameStoppedLoading`
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_identity_bearing(&self) -> bool {
        matches!(self.identity, Some(fields) if !fields.is_empty())
    }

    pub fn identity_fields(&self) -> &'static [IdentityField] {
        self.identity.unwrap_or(&[])
    }
}

/// The set of notification types a session knows how to key.
///
/// Notifications whose method is not registered are treated as broadcasts.
#[derive(Debug, Clone, Default)]
pub struct EventCatalogue {
    types: HashMap<&'static str, NotificationType>,
}

impl EventCatalogue {
    /// An empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification type described in [`crate::protocol`]
    pub fn builtin() -> Self {
        crate::protocol::page::NOTIFICATIONS
            .iter()
            .chain(crate::protocol::target::NOTIFICATIONS)
            .fold(Self::new(), |catalogue, kind| catalogue.with(*kind))
    }

    /// Registers (or replaces) a notification type
    pub fn with(mut self, kind: NotificationType) -> Self {
        self.types.insert(kind.name(), kind);
        self
    }

    pub fn lookup(&self, method: &str) -> Option<&NotificationType> {
        self.types.get(method)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
