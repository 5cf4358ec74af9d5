// Target domain

use crate::protocol::command::Command;
use crate::protocol::notification::{IdentityField, NotificationType};
use crate::protocol::schema::{FieldKind, FieldSpec, Schema};

const TARGET_ID: &[IdentityField] = &[IdentityField::flat("targetId")];

pub const TARGET_DESTROYED: NotificationType =
    NotificationType::identified("Target.targetDestroyed", TARGET_ID);

pub const DETACHED_FROM_TARGET: NotificationType =
    NotificationType::identified("Target.detachedFromTarget", TARGET_ID);

pub const RECEIVED_MESSAGE_FROM_TARGET: NotificationType =
    NotificationType::identified("Target.receivedMessageFromTarget", TARGET_ID);

pub const TARGET_CREATED: NotificationType = NotificationType::broadcast("Target.targetCreated");

pub(crate) const NOTIFICATIONS: &[NotificationType] = &[
    TARGET_DESTROYED,
    DETACHED_FROM_TARGET,
    RECEIVED_MESSAGE_FROM_TARGET,
    TARGET_CREATED,
];

pub const CREATE_TARGET_RESULT: Schema =
    Schema::new(&[FieldSpec::required("targetId", FieldKind::String)]);

pub const CLOSE_TARGET_RESULT: Schema =
    Schema::new(&[FieldSpec::optional("success", FieldKind::Boolean)]);

/// Opens a new page; its ack carries the `targetId` later target
/// notifications repeat.
pub fn create_target(url: &str) -> Command {
    Command::new("Target.createTarget")
        .param("url", url)
        .returns(CREATE_TARGET_RESULT)
}

pub fn activate_target(target_id: &str) -> Command {
    Command::new("Target.activateTarget").param("targetId", target_id)
}

pub fn close_target(target_id: &str) -> Command {
    Command::new("Target.closeTarget")
        .param("targetId", target_id)
        .returns(CLOSE_TARGET_RESULT)
}
