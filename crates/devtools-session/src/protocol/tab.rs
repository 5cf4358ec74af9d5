// Tab - a page target with its session
//
// Convenience operations built on Session::send for the common page chores.

use crate::api::SessionOptions;
use crate::error::{Error, Result};
use crate::protocol::{emulation, page, runtime};
use crate::server::discovery::TargetInfo;
use crate::server::session::{CommandResult, Session};
use base64::Engine;
use serde_json::Value;
use std::fmt;

/// One page target and the session attached to it.
///
/// # Example
///
/// ```ignore
/// use devtools_session::{Browser, BrowserOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut browser = Browser::new(BrowserOptions::new().port(9222));
///     browser.connect().await?;
///
///     let tab = &browser.tabs()?[0];
///     tab.enable_page_events().await?;
///     tab.go("https://example.com").await?;
///     println!("{}", tab.html().await?);
///
///     browser.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct Tab {
    title: String,
    url: String,
    target_id: String,
    session: Session,
}

impl Tab {
    /// Opens a session to a listed page target
    pub async fn connect(
        target: &TargetInfo,
        host: &str,
        port: u16,
        options: SessionOptions,
    ) -> Result<Self> {
        let socket_url = target.socket_url(host, port);
        let session = Session::connect(&socket_url, options)
            .await
            .map_err(|e| e.context(format!("Failed to attach to target {}", target.id)))?;
        Ok(Self::from_session(
            session,
            target.title.clone(),
            target.url.clone(),
        ))
    }

    pub fn from_session(session: Session, title: String, url: String) -> Self {
        let target_id = session.id().to_string();
        Self {
            title,
            url,
            target_id,
            session,
        }
    }

    /// Title as listed when the tab was discovered
    pub fn title(&self) -> &str {
        &self.title
    }

    /// URL as listed when the tab was discovered
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Sends `Page.enable` so frame notifications are emitted
    pub async fn enable_page_events(&self) -> Result<CommandResult> {
        self.session.send(&page::enable(), None).await
    }

    /// Navigates to `url` and waits for the navigated frame to stop loading.
    ///
    /// The returned result's `event` is `None` if loading did not finish
    /// within the session timeout. Page events must be enabled first.
    pub async fn go(&self, url: &str) -> Result<CommandResult> {
        self.session
            .send(&page::navigate(url), Some(&page::FRAME_STOPPED_LOADING))
            .await
    }

    /// Evaluates `expression` and returns the resulting remote object
    /// (with its `value` inlined).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptError`] if the expression threw.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let mut result = self.session.send(&runtime::evaluate(expression), None).await?;

        let remote_object = result.ack.remove("result").unwrap_or(Value::Null);
        let threw = remote_object.get("subtype").and_then(Value::as_str) == Some("error");
        if let Some(details) = result.ack.remove("exceptionDetails") {
            return Err(Error::ScriptError {
                reason: "Runtime.evaluate threw an exception".to_string(),
                details,
            });
        }
        if threw {
            return Err(Error::ScriptError {
                reason: "Runtime.evaluate returned an error object".to_string(),
                details: remote_object,
            });
        }

        Ok(remote_object)
    }

    /// The document's outer HTML
    pub async fn html(&self) -> Result<String> {
        let remote_object = self.evaluate("document.documentElement.outerHTML").await?;
        match remote_object.get("value") {
            Some(Value::String(html)) => Ok(html.clone()),
            other => Err(Error::UnexpectedResponse(format!(
                "Expected outer HTML string, got {}",
                other.unwrap_or(&Value::Null)
            ))),
        }
    }

    /// PNG screenshot of the viewport
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let result = self
            .session
            .send(&page::capture_screenshot(Some("png"), None, Some(false)), None)
            .await?;

        let data = result
            .ack
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();

        base64::prelude::BASE64_STANDARD
            .decode(data)
            .map_err(|e| Error::UnexpectedResponse(format!("Failed to decode screenshot: {}", e)))
    }

    /// Overrides the viewport size (device scale factor 1, desktop)
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<CommandResult> {
        self.session
            .send(
                &emulation::set_device_metrics_override(width, height, 1.0, false),
                None,
            )
            .await
    }

    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.url)
    }
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("title", &self.title)
            .field("url", &self.url)
            .field("target_id", &self.target_id)
            .finish()
    }
}
