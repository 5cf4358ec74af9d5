// Integration tests for session failure paths
//
// Tests cover:
// - Remote error objects, with and without an awaited notification
// - Result schema validation
// - Awaiting a notification type without identity fields
// - Awaiting a notification type missing from the session's catalogue
// - Ack results lacking the awaited notification's identity fields
// - Deadline expiry with the socket still open, and late acks
// - Socket closure classification (1002, 1006, 1007, 1009)
// - Sending after the socket has closed

mod common;

use common::{MockTarget, Step, ack, event};
use devtools_session::protocol::page;
use devtools_session::protocol::target::TARGET_DESTROYED;
use devtools_session::{
    Command, Error, EventCatalogue, IdentityField, LoopState, NotificationType, ProtocolError,
    Session, SessionOptions,
};
use serde_json::json;
use std::time::Duration;

fn options(timeout_ms: u64) -> SessionOptions {
    SessionOptions::new().timeout(Duration::from_millis(timeout_ms))
}

const LOADING_FINISHED: NotificationType =
    NotificationType::identified("Network.loadingFinished", &[IdentityField::flat("requestId")]);

// Registered name, different identity fields
const TARGET_DESTROYED_BY_SESSION: NotificationType =
    NotificationType::identified("Target.targetDestroyed", &[IdentityField::flat("sessionId")]);

fn remote_error(request: &serde_json::Value) -> Step {
    Step::Json(json!({
        "id": common::request_id(request),
        "error": {"code": -32000, "message": "Cannot navigate to invalid URL"}
    }))
}

async fn wait_until_closed(session: &Session) {
    for _ in 0..100 {
        if session.is_closed() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session did not close");
}

#[tokio::test]
async fn test_error_ack_raises_protocol_error() {
    common::init_tracing();

    let target = MockTarget::start(|request| vec![remote_error(request)]).await;
    let session = Session::connect(&target.url(), options(2_000)).await.unwrap();

    let plain = session.send(&page::navigate("nope"), None).await;
    let awaiting = session
        .send(&page::navigate("nope"), Some(&page::FRAME_STOPPED_LOADING))
        .await;

    for (result, expected_id) in [(plain, 1), (awaiting, 2)] {
        match result {
            Err(Error::Protocol(ProtocolError::Remote { code, message, id })) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "Cannot navigate to invalid URL");
                assert_eq!(id, expected_id);
            }
            other => panic!("Expected remote protocol error, got {:?}", other),
        }
    }

    // No event waiter is left behind by the failed await
    assert_eq!(session.tables().events().waiting(), 0);
    session.disconnect().await;
}

#[tokio::test]
async fn test_result_not_matching_schema_is_a_validation_error() {
    common::init_tracing();

    let target = MockTarget::start(|request| vec![ack(request, json!({"frameId": 5}))]).await;
    let session = Session::connect(&target.url(), options(2_000)).await.unwrap();

    let err = session
        .send(&page::navigate("http://localhost:8000"), None)
        .await
        .unwrap_err();
    match err {
        Error::ValidationError { method, field, .. } => {
            assert_eq!(method, "Page.navigate");
            assert_eq!(field, "frameId");
        }
        other => panic!("Expected ValidationError, got {:?}", other),
    }

    session.disconnect().await;
}

#[tokio::test]
async fn test_awaiting_broadcast_notification_is_rejected_before_sending() {
    common::init_tracing();

    let target = MockTarget::start(|request| vec![ack(request, json!({}))]).await;
    let session = Session::connect(&target.url(), options(2_000)).await.unwrap();

    let err = session
        .send(&page::reload(None), Some(&page::LOAD_EVENT_FIRED))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnhashableType(ref name) if name == "Page.loadEventFired"));
    assert_eq!(session.last_request_id(), 0);

    // The session is unaffected
    assert_eq!(session.send(&page::enable(), None).await.unwrap().id, 1);
    assert_eq!(target.requests().len(), 1);

    session.disconnect().await;
}

fn loading_finished_script(request: &serde_json::Value) -> Vec<Step> {
    vec![
        event(
            "Network.loadingFinished",
            json!({"requestId": "R1", "timestamp": 1.5}),
        ),
        ack(request, json!({"requestId": "R1"})),
    ]
}

#[tokio::test]
async fn test_awaiting_type_outside_catalogue_is_rejected_before_sending() {
    common::init_tracing();

    let target = MockTarget::start(loading_finished_script).await;
    let session = Session::connect(&target.url(), options(2_000)).await.unwrap();

    let err = session
        .send(&Command::new("Network.getResponseBody"), Some(&LOADING_FINISHED))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::UnknownNotificationType(ref name) if name == "Network.loadingFinished"),
        "got {:?}",
        err
    );
    assert_eq!(session.last_request_id(), 0);
    assert!(target.requests().is_empty());

    // A descriptor that differs from the registered one is rejected too
    let err = session
        .send(
            &Command::new("Target.closeTarget"),
            Some(&TARGET_DESTROYED_BY_SESSION),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownNotificationType(_)), "got {:?}", err);
    assert_eq!(session.last_request_id(), 0);

    session.disconnect().await;
}

#[tokio::test]
async fn test_awaiting_type_registered_in_catalogue_is_correlated() {
    common::init_tracing();

    let target = MockTarget::start(loading_finished_script).await;
    let catalogue = EventCatalogue::builtin().with(LOADING_FINISHED);
    let session = Session::connect(&target.url(), options(2_000).catalogue(catalogue))
        .await
        .unwrap();

    let result = session
        .send(&Command::new("Network.getResponseBody"), Some(&LOADING_FINISHED))
        .await
        .unwrap();
    assert_eq!(result.id, 1);
    let notification = result.event.expect("loadingFinished should be correlated");
    assert_eq!(notification.method, "Network.loadingFinished");
    assert_eq!(notification.params["timestamp"], 1.5);

    session.disconnect().await;
}

#[tokio::test]
async fn test_ack_without_identity_field_returns_ack_without_event() {
    common::init_tracing();

    let target = MockTarget::start(|request| vec![ack(request, json!({}))]).await;
    let session = Session::connect(&target.url(), options(5_000)).await.unwrap();

    let started = std::time::Instant::now();
    let result = session
        .send(&Command::new("Target.createTarget"), Some(&TARGET_DESTROYED))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.id, 1);
    assert!(result.ack.is_empty());
    assert!(result.event.is_none());
    assert_eq!(session.tables().events().waiting(), 0);

    session.disconnect().await;
}

#[tokio::test]
async fn test_missing_ack_times_out_and_session_stays_usable() {
    common::init_tracing();

    let target = MockTarget::start(|request| {
        if request["method"] == "Slow.method" {
            Vec::new()
        } else {
            vec![ack(request, json!({}))]
        }
    })
    .await;
    let session = Session::connect(&target.url(), options(200)).await.unwrap();

    let err = session
        .send(&Command::new("Slow.method"), None)
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "Expected timeout, got {:?}", err);
    assert!(err.to_string().contains("\"Slow.method\" with id=1"));
    assert_eq!(session.tables().acks().waiting(), 0);

    let result = session.send(&page::enable(), None).await.unwrap();
    assert_eq!(result.id, 2);

    session.disconnect().await;
}

#[tokio::test]
async fn test_late_ack_is_retained_and_ids_move_on() {
    common::init_tracing();

    let target = MockTarget::start(|request| {
        if request["method"] == "Slow.method" {
            vec![
                Step::Sleep(Duration::from_millis(400)),
                ack(request, json!({"late": true})),
            ]
        } else {
            vec![ack(request, json!({}))]
        }
    })
    .await;
    let session = Session::connect(&target.url(), options(200)).await.unwrap();

    let err = session
        .send(&Command::new("Slow.method"), None)
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "Expected timeout, got {:?}", err);

    for _ in 0..100 {
        if session.tables().acks().delivered() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(session.tables().acks().delivered(), 1);
    assert_eq!(session.tables().acks().waiting(), 0);

    let result = session.send(&page::enable(), None).await.unwrap();
    assert_eq!(result.id, 2);
    assert!(result.ack.is_empty());

    session.disconnect().await;
}

#[tokio::test]
async fn test_close_code_1002_is_a_protocol_violation() {
    common::init_tracing();

    let target = MockTarget::start(|_| vec![Step::Close(1002)]).await;
    let session = Session::connect(&target.url(), options(2_000)).await.unwrap();

    let err = session.send(&page::enable(), None).await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Protocol(ProtocolError::Violation { ref method, id: 1 }) if method == "Page.enable"
        ),
        "got {:?}",
        err
    );

    session.disconnect().await;
}

#[tokio::test]
async fn test_close_code_1007_is_invalid_text() {
    common::init_tracing();

    let target = MockTarget::start(|_| vec![Step::Close(1007)]).await;
    let session = Session::connect(&target.url(), options(2_000)).await.unwrap();

    let err = session.send(&page::enable(), None).await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Protocol(ProtocolError::InvalidText { ref method, id: 1 }) if method == "Page.enable"
        ),
        "got {:?}",
        err
    );

    session.disconnect().await;
}

#[tokio::test]
async fn test_dropped_connection_is_an_incomplete_read() {
    common::init_tracing();

    let target = MockTarget::start(|_| vec![Step::Drop]).await;
    let session = Session::connect(&target.url(), options(2_000)).await.unwrap();

    let err = session.send(&page::enable(), None).await.unwrap_err();
    assert!(
        matches!(err, Error::Protocol(ProtocolError::IncompleteRead { id: 1, .. })),
        "got {:?}",
        err
    );

    session.disconnect().await;
}

#[tokio::test]
async fn test_oversized_frame_is_payload_too_large() {
    common::init_tracing();

    let target = MockTarget::start(|request| {
        vec![ack(request, json!({"data": "A".repeat(4096)}))]
    })
    .await;
    let session = Session::connect(&target.url(), options(2_000).max_frame_size(1024))
        .await
        .unwrap();

    let err = session
        .send(&page::capture_screenshot(Some("png"), None, None), None)
        .await
        .unwrap_err();
    match err {
        Error::Protocol(ProtocolError::PayloadTooLarge { method, id, limit }) => {
            assert_eq!(method, "Page.captureScreenshot");
            assert_eq!(id, 1);
            assert_eq!(limit, 1024);
        }
        other => panic!("Expected PayloadTooLarge, got {:?}", other),
    }

    session.disconnect().await;
}

#[tokio::test]
async fn test_send_after_socket_closed_fails_fast() {
    common::init_tracing();

    let target = MockTarget::start_with_greeting(vec![Step::Close(1000)], |_| Vec::new()).await;
    let session = Session::connect(&target.url(), options(5_000)).await.unwrap();

    wait_until_closed(&session).await;
    assert_eq!(session.loop_state(), LoopState::Stopped);

    let started = std::time::Instant::now();
    let err = session.send(&page::enable(), None).await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed(_)), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(1));

    session.disconnect().await;
}
