use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::commands::CommandMode;
use crate::config::GithubConfig;
use crate::relay::AutomationTrigger;

#[derive(Debug, Serialize)]
pub struct DispatchRequest {
    pub event_type: String,
    pub client_payload: ClientPayload,
}

#[derive(Debug, Serialize)]
pub struct ClientPayload {
    pub mode: CommandMode,
    pub user_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl DispatchRequest {
    pub fn new(event_type: &str, mode: CommandMode, user_id: u64) -> Self {
        Self {
            event_type: event_type.to_string(),
            client_payload: ClientPayload {
                mode,
                user_id,
                timestamp: Some(
                    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                ),
            },
        }
    }
}

/// Fires `repository_dispatch` events on a GitHub repository.
pub struct GithubDispatcher {
    client: reqwest::Client,
    config: GithubConfig,
}

impl GithubDispatcher {
    pub fn new(config: GithubConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dispatchbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build GitHub HTTP client")?;
        Ok(Self { client, config })
    }

    fn dispatch_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/dispatches",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo
        )
    }
}

#[async_trait]
impl AutomationTrigger for GithubDispatcher {
    async fn trigger(&self, mode: CommandMode, user_id: u64) -> Result<()> {
        let request = DispatchRequest::new(&self.config.event_type, mode, user_id);
        let url = self.dispatch_url();

        debug!("Sending repository dispatch to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to GitHub")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!("GitHub API error: {} {}", status, error_body);
            anyhow::bail!("GitHub API error ({}): {}", status, error_body);
        }

        Ok(())
    }
}
