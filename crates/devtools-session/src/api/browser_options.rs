use std::time::Duration;

/// Default DevTools listing port (`--remote-debugging-port`)
pub const DEFAULT_PORT: u16 = 9222;

/// Options for `Browser`: where its DevTools HTTP endpoint lives.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Host of the DevTools HTTP endpoint. Defaults to `localhost`.
    pub host: String,
    /// Port of the DevTools HTTP endpoint. Defaults to 9222.
    pub port: u16,
    /// Maximum time to wait for the target listing. Defaults to 5 seconds.
    pub discovery_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            discovery_timeout: Duration::from_secs(5),
        }
    }
}

impl BrowserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Base URL of the HTTP endpoint, e.g. `http://localhost:9222`
    pub fn http_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
