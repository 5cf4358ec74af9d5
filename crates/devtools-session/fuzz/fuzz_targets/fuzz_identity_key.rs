#![no_main]

use devtools_session::protocol::page;
use devtools_session::server::identity::{hash_from_ack_result, hash_from_event};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // An ack result and a notification body carrying the same frame id must
    // produce the same key.
    let Some(result) = value.as_object() else {
        return;
    };
    let Ok(from_ack) = hash_from_ack_result(&page::FRAME_NAVIGATED, result) else {
        return;
    };
    let body = serde_json::json!({"frame": {"id": result["frameId"].clone()}});
    let from_event = hash_from_event(&page::FRAME_NAVIGATED, &body).unwrap();
    assert_eq!(from_ack, from_event);
});
