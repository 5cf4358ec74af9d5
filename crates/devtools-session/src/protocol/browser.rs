// Browser - the DevTools HTTP endpoint and its page tabs

use crate::api::{BrowserOptions, SessionOptions};
use crate::error::{Error, Result};
use crate::protocol::tab::Tab;
use crate::server::discovery::{self, TargetInfo};

/// A browser reachable at `http://{host}:{port}`, exposing its page targets
/// as [`Tab`]s once connected.
pub struct Browser {
    options: BrowserOptions,
    session_options: SessionOptions,
    tabs: Vec<Tab>,
    is_connected: bool,
}

impl Browser {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            session_options: SessionOptions::default(),
            tabs: Vec::new(),
            is_connected: false,
        }
    }

    /// Options applied to every tab session opened by [`Browser::connect`]
    pub fn session_options(mut self, options: SessionOptions) -> Self {
        self.session_options = options;
        self
    }

    pub fn host(&self) -> &str {
        &self.options.host
    }

    pub fn port(&self) -> u16 {
        self.options.port
    }

    /// Base URL of the HTTP endpoint
    pub fn url(&self) -> String {
        self.options.http_url()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Lists the page targets without attaching to them
    pub async fn fetch_targets(&self) -> Result<Vec<TargetInfo>> {
        discovery::fetch_targets(&self.options).await
    }

    /// Lists page targets and opens a session to each.
    ///
    /// Does nothing if already connected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected {
            return Ok(());
        }

        let targets = self.fetch_targets().await?;
        let mut tabs = Vec::with_capacity(targets.len());
        for target in &targets {
            let tab = Tab::connect(
                target,
                &self.options.host,
                self.options.port,
                self.session_options.clone(),
            )
            .await;
            match tab {
                Ok(tab) => tabs.push(tab),
                Err(e) => {
                    for opened in &tabs {
                        opened.disconnect().await;
                    }
                    return Err(e);
                }
            }
        }

        tracing::debug!("Connected to browser at {}, found {} tabs", self.url(), tabs.len());
        self.tabs = tabs;
        self.is_connected = true;
        Ok(())
    }

    /// The tabs opened by [`Browser::connect`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if not connected, or connected to a
    /// browser with no page targets.
    pub fn tabs(&self) -> Result<&[Tab]> {
        if self.tabs.is_empty() {
            return Err(Error::InvalidArgument(
                "No tabs available, call Browser::connect first".to_string(),
            ));
        }
        Ok(&self.tabs)
    }

    /// Disconnects every tab
    pub async fn disconnect(&mut self) {
        for tab in &self.tabs {
            tab.disconnect().await;
        }
        self.tabs.clear();
        self.is_connected = false;
    }
}
