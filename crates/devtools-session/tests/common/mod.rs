// Shared helpers for integration tests
//
// Each test binary compiles this module separately, so helpers unused by one
// binary are still used by another.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// Installs a fmt subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted action of the mock target
#[derive(Debug, Clone)]
pub enum Step {
    Json(Value),
    /// Raw text frame, sent as is
    Text(String),
    Binary(Vec<u8>),
    Sleep(Duration),
    /// Close frame with this code
    Close(u16),
    /// Drop the TCP stream without a close frame
    Drop,
}

type Script = dyn Fn(&Value) -> Vec<Step> + Send + Sync;

/// In-process DevTools target answering each request from a script.
///
/// Steps for one request run in order before the next request is read.
pub struct MockTarget {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
    handle: JoinHandle<()>,
}

impl MockTarget {
    pub async fn start<F>(script: F) -> Self
    where
        F: Fn(&Value) -> Vec<Step> + Send + Sync + 'static,
    {
        Self::start_with_greeting(Vec::new(), script).await
    }

    /// Like [`MockTarget::start`], sending `greeting` as soon as a client connects
    pub async fn start_with_greeting<F>(greeting: Vec<Step>, script: F) -> Self
    where
        F: Fn(&Value) -> Vec<Step> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script: Arc<Script> = Arc::new(script);

        let recorded = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let script = Arc::clone(&script);
                let recorded = Arc::clone(&recorded);
                let greeting = greeting.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(stream).await else {
                        return;
                    };
                    if !play(&mut ws, greeting).await {
                        return;
                    }
                    while let Some(Ok(message)) = ws.next().await {
                        let Message::Text(text) = message else {
                            continue;
                        };
                        let request: Value = serde_json::from_str(text.as_str()).unwrap();
                        recorded.lock().push(request.clone());
                        if !play(&mut ws, script(&request)).await {
                            return;
                        }
                    }
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// Debugger URL of the mock page target `MOCK`
    pub fn url(&self) -> String {
        format!("ws://{}/devtools/page/MOCK", self.addr)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }
}

impl Drop for MockTarget {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Plays `steps`; false once the connection is gone
async fn play<S>(ws: &mut tokio_tungstenite::WebSocketStream<S>, steps: Vec<Step>) -> bool
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    for step in steps {
        let sent = match step {
            Step::Json(value) => ws.send(Message::text(value.to_string())).await,
            Step::Text(text) => ws.send(Message::text(text)).await,
            Step::Binary(bytes) => ws.send(Message::binary(bytes)).await,
            Step::Sleep(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Step::Close(code) => {
                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: "".into(),
                };
                let _ = ws.send(Message::Close(Some(frame))).await;
                return false;
            }
            Step::Drop => return false,
        };
        if sent.is_err() {
            return false;
        }
    }
    true
}

/// Request id of a recorded request
pub fn request_id(request: &Value) -> u64 {
    request["id"].as_u64().unwrap()
}

/// `{"id": .., "result": result}` for `request`
pub fn ack(request: &Value, result: Value) -> Step {
    Step::Json(serde_json::json!({"id": request_id(request), "result": result}))
}

/// `{"method": .., "params": ..}`
pub fn event(method: &str, params: Value) -> Step {
    Step::Json(serde_json::json!({"method": method, "params": params}))
}
