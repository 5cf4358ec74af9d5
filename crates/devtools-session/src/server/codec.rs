//! Wire codec for DevTools protocol messages
//!
//! Outbound commands are `{id, method, params}` objects. Inbound text is
//! classified exactly once, here, into a [`Frame`]: an ack (has `id`), a
//! notification (has `method`), or malformed.

use crate::error::Result;
use crate::protocol::Command;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol request message sent to the target
#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "no_params")]
    params: &'a Map<String, Value>,
}

fn no_params(params: &&Map<String, Value>) -> bool {
    params.is_empty()
}

/// Serializes `command` as request `id`
pub fn encode(id: u64, command: &Command) -> Result<String> {
    let request = Request {
        id,
        method: command.method(),
        params: command.params(),
    };
    Ok(serde_json::to_string(&request)?)
}

/// Error object carried by a failed ack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// What an ack carries
#[derive(Debug, Clone, PartialEq)]
pub enum AckOutcome {
    Result(Map<String, Value>),
    Error(RemoteError),
}

/// Direct response to a command, correlated by request id
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub id: u64,
    pub outcome: AckOutcome,
}

/// Pushed notification, e.g. `Page.frameStoppedLoading`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    /// Deserializes the notification body into a typed shape
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.params.clone())?)
    }
}

/// One decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Ack(Ack),
    Notification(Notification),
    /// Unparseable or unrecognizable text; the reason is for logging only
    Malformed(String),
}

/// Classifies inbound text. Never fails: anything unusable becomes
/// [`Frame::Malformed`].
pub fn decode(text: &str) -> Frame {
    let mut object = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => object,
        Ok(other) => return Frame::Malformed(format!("expected a JSON object, got {other}")),
        Err(e) => return Frame::Malformed(format!("failed to parse JSON: {e}")),
    };

    if let Some(id) = object.get("id") {
        let Some(id) = id.as_u64() else {
            return Frame::Malformed(format!("ack id is not a non-negative integer: {id}"));
        };
        return decode_ack(id, &mut object);
    }

    match object.remove("method") {
        Some(Value::String(method)) => {
            let params = object
                .remove("params")
                .unwrap_or_else(|| Value::Object(Map::new()));
            Frame::Notification(Notification { method, params })
        }
        Some(other) => Frame::Malformed(format!("notification method is not a string: {other}")),
        None => Frame::Malformed("message has neither 'id' nor 'method'".to_string()),
    }
}

fn decode_ack(id: u64, object: &mut Map<String, Value>) -> Frame {
    if let Some(error) = object.remove("error") {
        return match serde_json::from_value::<RemoteError>(error) {
            Ok(error) => Frame::Ack(Ack {
                id,
                outcome: AckOutcome::Error(error),
            }),
            Err(e) => Frame::Malformed(format!("ack {id} has an invalid error object: {e}")),
        };
    }

    match object.remove("result") {
        Some(Value::Object(result)) => Frame::Ack(Ack {
            id,
            outcome: AckOutcome::Result(result),
        }),
        None | Some(Value::Null) => Frame::Ack(Ack {
            id,
            outcome: AckOutcome::Result(Map::new()),
        }),
        Some(other) => Frame::Malformed(format!("ack {id} result is not an object: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::page;
    use serde_json::json;

    #[test]
    fn test_encode_writes_id_method_params() {
        let text = encode(4, &page::navigate("http://example.com")).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"id": 4, "method": "Page.navigate", "params": {"url": "http://example.com"}})
        );
    }

    #[test]
    fn test_encode_omits_empty_params() {
        let text = encode(1, &page::enable()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"id": 1, "method": "Page.enable"}));
    }

    #[test]
    fn test_encoded_id_matches_synthetic_ack() {
        let text = encode(17, &page::enable()).unwrap();
        let sent: Value = serde_json::from_str(&text).unwrap();
        let reply = json!({"id": sent["id"], "result": {}}).to_string();
        match decode(&reply) {
            Frame::Ack(ack) => assert_eq!(ack.id, 17),
            other => panic!("Expected ack, got: {other:?}"),
        }
    }

    #[test]
    fn test_decode_ack_with_result() {
        let frame = decode(r#"{"id": 4, "result": {"frameId": "3228.1"}}"#);
        let expected = json!({"frameId": "3228.1"}).as_object().cloned().unwrap();
        assert_eq!(
            frame,
            Frame::Ack(Ack {
                id: 4,
                outcome: AckOutcome::Result(expected)
            })
        );
    }

    #[test]
    fn test_decode_ack_with_error() {
        let frame = decode(r#"{"id": 9, "error": {"code": -32601, "message": "'Foo.bar' wasn't found"}}"#);
        match frame {
            Frame::Ack(Ack {
                id: 9,
                outcome: AckOutcome::Error(error),
            }) => {
                assert_eq!(error.code, -32601);
                assert_eq!(error.message, "'Foo.bar' wasn't found");
            }
            other => panic!("Expected error ack, got: {other:?}"),
        }
    }

    #[test]
    fn test_decode_notification_defaults_params() {
        let frame = decode(r#"{"method": "Page.loadEventFired"}"#);
        assert_eq!(
            frame,
            Frame::Notification(Notification {
                method: "Page.loadEventFired".to_string(),
                params: json!({}),
            })
        );
    }

    #[test]
    fn test_decode_malformed_inputs() {
        for text in [
            "not json at all",
            "[1, 2, 3]",
            r#"{"foo": "bar"}"#,
            r#"{"id": "seven", "result": {}}"#,
            r#"{"id": 3, "result": [1]}"#,
            r#"{"method": 12}"#,
        ] {
            assert!(
                matches!(decode(text), Frame::Malformed(_)),
                "expected malformed for {text}"
            );
        }
    }

    #[test]
    fn test_params_as_typed_body() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct StoppedLoading {
            frame_id: String,
        }

        let notification = Notification {
            method: "Page.frameStoppedLoading".to_string(),
            params: json!({"frameId": "3228.1"}),
        };
        let typed: StoppedLoading = notification.params_as().unwrap();
        assert_eq!(typed.frame_id, "3228.1");
    }
}
