// Page domain
//
// Commands and notifications of the `Page` domain used by this crate.
// See: https://chromedevtools.github.io/devtools-protocol/tot/Page/

use crate::protocol::command::Command;
use crate::protocol::notification::{IdentityField, NotificationType};
use crate::protocol::schema::{FieldKind, FieldSpec, Schema};

const FRAME_ID: &[IdentityField] = &[IdentityField::flat("frameId")];

/// Fired once a frame has been attached to its parent
pub const FRAME_ATTACHED: NotificationType = NotificationType::identified(
    "Page.frameAttached",
    &[
        IdentityField::flat("frameId"),
        IdentityField::flat("parentFrameId"),
    ],
);

/// Fired once navigation of the frame has completed. The body carries the
/// whole `Frame`, so its identity is read from `frame.id`.
pub const FRAME_NAVIGATED: NotificationType = NotificationType::identified(
    "Page.frameNavigated",
    &[IdentityField::nested("frameId", &["frame", "id"])],
);

pub const FRAME_DETACHED: NotificationType =
    NotificationType::identified("Page.frameDetached", FRAME_ID);

pub const FRAME_STARTED_LOADING: NotificationType =
    NotificationType::identified("Page.frameStartedLoading", FRAME_ID);

pub const FRAME_STOPPED_LOADING: NotificationType =
    NotificationType::identified("Page.frameStoppedLoading", FRAME_ID);

pub const FRAME_SCHEDULED_NAVIGATION: NotificationType =
    NotificationType::identified("Page.frameScheduledNavigation", FRAME_ID);

pub const FRAME_CLEARED_SCHEDULED_NAVIGATION: NotificationType =
    NotificationType::identified("Page.frameClearedScheduledNavigation", FRAME_ID);

pub const SCREENCAST_FRAME: NotificationType = NotificationType::identified(
    "Page.screencastFrame",
    &[IdentityField::flat("sessionId")],
);

pub const DOM_CONTENT_EVENT_FIRED: NotificationType =
    NotificationType::broadcast("Page.domContentEventFired");

pub const LOAD_EVENT_FIRED: NotificationType = NotificationType::broadcast("Page.loadEventFired");

pub const FRAME_RESIZED: NotificationType = NotificationType::broadcast("Page.frameResized");

pub const JAVASCRIPT_DIALOG_OPENING: NotificationType =
    NotificationType::broadcast("Page.javascriptDialogOpening");

pub const JAVASCRIPT_DIALOG_CLOSED: NotificationType =
    NotificationType::broadcast("Page.javascriptDialogClosed");

pub(crate) const NOTIFICATIONS: &[NotificationType] = &[
    FRAME_ATTACHED,
    FRAME_NAVIGATED,
    FRAME_DETACHED,
    FRAME_STARTED_LOADING,
    FRAME_STOPPED_LOADING,
    FRAME_SCHEDULED_NAVIGATION,
    FRAME_CLEARED_SCHEDULED_NAVIGATION,
    SCREENCAST_FRAME,
    DOM_CONTENT_EVENT_FIRED,
    LOAD_EVENT_FIRED,
    FRAME_RESIZED,
    JAVASCRIPT_DIALOG_OPENING,
    JAVASCRIPT_DIALOG_CLOSED,
];

pub const NAVIGATE_RESULT: Schema = Schema::new(&[
    FieldSpec::required("frameId", FieldKind::String),
    FieldSpec::optional("loaderId", FieldKind::String),
    FieldSpec::optional("errorText", FieldKind::String),
    FieldSpec::optional("isDownload", FieldKind::Boolean),
]);

pub const CAPTURE_SCREENSHOT_RESULT: Schema =
    Schema::new(&[FieldSpec::required("data", FieldKind::String)]);

/// Enables page domain notifications
pub fn enable() -> Command {
    Command::new("Page.enable")
}

pub fn disable() -> Command {
    Command::new("Page.disable")
}

/// Navigates the page to `url`.
///
/// The ack result carries the `frameId` that later frame notifications repeat,
/// which makes this the usual command to pair with [`FRAME_STOPPED_LOADING`].
pub fn navigate(url: &str) -> Command {
    navigate_with(url, None, None)
}

pub fn navigate_with(url: &str, referrer: Option<&str>, transition_type: Option<&str>) -> Command {
    Command::new("Page.navigate")
        .param("url", url)
        .optional_param("referrer", referrer)
        .optional_param("transitionType", transition_type)
        .returns(NAVIGATE_RESULT)
}

pub fn reload(ignore_cache: Option<bool>) -> Command {
    Command::new("Page.reload").optional_param("ignoreCache", ignore_cache)
}

/// Captures a screenshot; the result's `data` is base64 encoded
pub fn capture_screenshot(
    format: Option<&str>,
    quality: Option<u8>,
    from_surface: Option<bool>,
) -> Command {
    Command::new("Page.captureScreenshot")
        .optional_param("format", format)
        .optional_param("quality", quality)
        .optional_param("fromSurface", from_surface)
        .returns(CAPTURE_SCREENSHOT_RESULT)
}
