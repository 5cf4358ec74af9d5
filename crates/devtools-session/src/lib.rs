//! devtools-session: Correlating client for the Chrome DevTools Protocol
//!
//! A [`Session`] holds one WebSocket to one DevTools target. Each command is
//! issued with a fresh request id and resolved by the matching ack; a command
//! may also name the notification it causes, which is matched by the identity
//! fields shared between the ack result and the notification body. The
//! notification may arrive before or after the ack.
//!
//! # Examples
//!
//! ## Navigate and wait for the frame to finish loading
//!
//! ```ignore
//! use devtools_session::protocol::page;
//! use devtools_session::{Session, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::connect(
//!         "ws://localhost:9222/devtools/page/5F1B2D",
//!         SessionOptions::from_env(),
//!     )
//!     .await?;
//!
//!     session.send(&page::enable(), None).await?;
//!     let result = session
//!         .send(
//!             &page::navigate("https://example.com"),
//!             Some(&page::FRAME_STOPPED_LOADING),
//!         )
//!         .await?;
//!     println!("frame {} loaded: {}", result.ack["frameId"], result.event.is_some());
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Discover tabs
//!
//! ```ignore
//! use devtools_session::{Browser, BrowserOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut browser = Browser::new(BrowserOptions::new().host("127.0.0.1"));
//!     browser.connect().await?;
//!     for tab in browser.tabs()? {
//!         println!("{tab}");
//!     }
//!     browser.disconnect().await;
//!     Ok(())
//! }
//! ```

// Internal modules (exposed for integration tests)
#[doc(hidden)]
pub mod server;

pub mod api;
mod error;
pub mod protocol;

// Re-export error types
pub use error::{Error, ProtocolError, Result};

// Re-export configuration
pub use api::{BrowserOptions, DEFAULT_MAX_FRAME_SIZE, DEFAULT_TIMEOUT, SessionOptions};

// Re-export the session and its results
pub use server::codec::Notification;
pub use server::dispatch::LoopState;
pub use server::discovery::TargetInfo;
pub use server::session::{CommandResult, Session};
pub use server::transport::SocketStatus;

// Re-export protocol descriptors and page objects
pub use protocol::{
    Browser, Command, EventCatalogue, FieldKind, FieldSpec, IdentityField, NotificationType,
    Schema, Tab,
};
