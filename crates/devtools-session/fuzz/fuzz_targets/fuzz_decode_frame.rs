#![no_main]

use devtools_session::server::codec::{Frame, decode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding never panics, and anything classified as an ack or
    // notification came from a JSON object.
    match decode(text) {
        Frame::Ack(_) | Frame::Notification(_) => {
            let value: serde_json::Value = serde_json::from_str(text).unwrap();
            assert!(value.is_object());
        }
        Frame::Malformed(_) => {}
    }
});
