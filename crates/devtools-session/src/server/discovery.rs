// Target discovery over the DevTools HTTP endpoint
//
// GET {http_url}/json lists every target; only page targets get a session.

use crate::api::BrowserOptions;
use crate::error::{Error, Result};
use serde::Deserialize;

/// One entry of the `/json` listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

impl TargetInfo {
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }

    /// Debugger URL as listed, or `ws://host:port/devtools/page/{id}` when the
    /// listing omits it (another client is already attached)
    pub fn socket_url(&self, host: &str, port: u16) -> String {
        match &self.web_socket_debugger_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("ws://{}:{}/devtools/page/{}", host, port, self.id),
        }
    }
}

/// Fetches the target listing and keeps the page targets
pub async fn fetch_targets(options: &BrowserOptions) -> Result<Vec<TargetInfo>> {
    let url = format!("{}/json", options.http_url());
    tracing::debug!("Fetching DevTools targets from {}", url);

    let client = reqwest::Client::builder()
        .timeout(options.discovery_timeout)
        .build()
        .map_err(|e| Error::Discovery(format!("Failed to build HTTP client: {}", e)))?;

    let response = client.get(&url).send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Discovery(format!(
                "Timed out after {:?} fetching {}",
                options.discovery_timeout, url
            ))
        } else {
            Error::Discovery(format!("Failed to fetch {}: {}", url, e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Discovery(format!("{} returned {}", url, status)));
    }

    let targets: Vec<TargetInfo> = response
        .json()
        .await
        .map_err(|e| Error::Discovery(format!("Invalid target listing from {}: {}", url, e)))?;

    if targets.is_empty() {
        tracing::warn!("Empty target listing from {}", url);
    }

    let pages: Vec<TargetInfo> = targets.into_iter().filter(TargetInfo::is_page).collect();
    tracing::debug!("Found {} page targets", pages.len());
    Ok(pages)
}
