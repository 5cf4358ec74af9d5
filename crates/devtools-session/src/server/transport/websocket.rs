use super::{SocketState, TransportReceiver, TransportSender, close_code};
use crate::{Error, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport to a DevTools target
pub struct WebSocketTransport {
    message_tx: mpsc::UnboundedSender<String>,
    sender: SplitSink<WsStream, WsMessage>,
    receiver: SplitStream<WsStream>,
    state: Arc<SocketState>,
}

pub struct WebSocketTransportReceiver {
    receiver: SplitStream<WsStream>,
    message_tx: mpsc::UnboundedSender<String>,
    state: Arc<SocketState>,
}

// Wrapper for the sender part
pub struct WebSocketTransportSender {
    sender: SplitSink<WsStream, WsMessage>,
    state: Arc<SocketState>,
}

impl WebSocketTransport {
    /// Opens the socket. Inbound messages or frames larger than
    /// `max_frame_size` bytes are rejected by the socket layer and recorded as
    /// close code 1009.
    pub async fn connect(
        url: &str,
        headers: Option<&HashMap<String, String>>,
        max_frame_size: usize,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>)> {
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        // Parse URL to ensure validity
        let _parsed_url =
            Url::parse(url).map_err(|e| Error::ConnectionFailed(format!("Invalid URL: {}", e)))?;

        // Create base request from URL string (adds Sec-WebSocket-Key, etc.)
        use tokio_tungstenite::tungstenite::client::IntoClientRequest;
        let mut request = url
            .into_client_request()
            .map_err(|e| Error::ConnectionFailed(format!("Failed to build request: {}", e)))?;

        if let Some(headers_map) = headers {
            use std::str::FromStr;
            use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue};
            let headers = request.headers_mut();
            for (k, v) in headers_map {
                let name = HeaderName::from_str(k)
                    .map_err(|e| Error::ConnectionFailed(format!("Invalid header name: {}", e)))?;
                let value = HeaderValue::from_str(v)
                    .map_err(|e| Error::ConnectionFailed(format!("Invalid header value: {}", e)))?;
                headers.insert(name, value);
            }
        }

        let config = WebSocketConfig::default()
            .max_message_size(Some(max_frame_size))
            .max_frame_size(Some(max_frame_size));

        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(request, Some(config), false)
                .await
                .map_err(|e| {
                    Error::ConnectionFailed(format!("WebSocket connection failed: {}", e))
                })?;

        let (sender, receiver) = ws_stream.split();

        Ok((
            Self {
                message_tx,
                sender,
                receiver,
                state: Arc::new(SocketState::new()),
            },
            message_rx,
        ))
    }

    pub fn socket_state(&self) -> Arc<SocketState> {
        Arc::clone(&self.state)
    }

    pub fn into_parts(self) -> (WebSocketTransportSender, WebSocketTransportReceiver) {
        let sender = WebSocketTransportSender {
            sender: self.sender,
            state: Arc::clone(&self.state),
        };

        let receiver = WebSocketTransportReceiver {
            receiver: self.receiver,
            message_tx: self.message_tx,
            state: self.state,
        };

        (sender, receiver)
    }
}

/// Close code implied by a read error
fn close_code_for(error: &WsError) -> u16 {
    use tokio_tungstenite::tungstenite::error::ProtocolError;
    match error {
        WsError::Capacity(_) => close_code::MESSAGE_TOO_BIG,
        // Peer dropped the TCP stream without a close frame
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => close_code::ABNORMAL,
        WsError::Protocol(_) => close_code::PROTOCOL_ERROR,
        WsError::Utf8 { .. } => close_code::INVALID_PAYLOAD,
        _ => close_code::ABNORMAL,
    }
}

impl TransportSender for WebSocketTransportSender {
    fn send(&mut self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.sender
                .send(WsMessage::Text(text.into()))
                .await
                .map_err(|e| {
                    Error::TransportError(format!("Failed to send WebSocket message: {}", e))
                })
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.state.mark_closed(Some(close_code::NORMAL));
            match self.sender.close().await {
                Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
                Err(e) => Err(Error::TransportError(format!(
                    "Failed to close WebSocket: {}",
                    e
                ))),
            }
        })
    }
}

impl TransportReceiver for WebSocketTransportReceiver {
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            while let Some(msg_result) = self.receiver.next().await {
                match msg_result {
                    Ok(WsMessage::Text(text)) => {
                        if self.message_tx.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Binary(bytes)) => {
                        // DevTools speaks text; a binary frame is tolerated
                        // only if it holds UTF-8 JSON.
                        match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => {
                                if self.message_tx.send(text).is_err() {
                                    break;
                                }
                            }
                            Err(_) => tracing::warn!("Dropping non-UTF-8 binary frame"),
                        }
                    }
                    Ok(WsMessage::Close(frame)) => {
                        let code = frame.map(|f| u16::from(f.code));
                        tracing::debug!(?code, "WebSocket closed by peer");
                        self.state.mark_closed(code);
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.state.mark_closed(Some(close_code_for(&e)));
                        return Err(Error::TransportError(format!(
                            "WebSocket read error: {}",
                            e
                        )));
                    }
                }
            }
            // Stream ended without a close frame
            self.state.mark_closed(Some(close_code::ABNORMAL));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parsing_in_connect() {
        // connect() needs a live peer; tests/transport_websocket_test.rs covers it.
        let url = Url::parse("ws://127.0.0.1:9222/devtools/page/ABC").unwrap();
        assert_eq!(url.port(), Some(9222));
    }

    #[test]
    fn test_read_errors_map_to_close_codes() {
        use tokio_tungstenite::tungstenite::error::ProtocolError;
        assert_eq!(
            close_code_for(&WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)),
            close_code::ABNORMAL
        );
        assert_eq!(
            close_code_for(&WsError::Protocol(ProtocolError::MaskedFrameFromServer)),
            close_code::PROTOCOL_ERROR
        );
        assert_eq!(
            close_code_for(&WsError::ConnectionClosed),
            close_code::ABNORMAL
        );
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = WebSocketTransport::connect("not a url", None, 1024).await;
        assert!(matches!(result, Err(Error::ConnectionFailed(_))));
    }
}
