use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::NotionConfig;
use crate::platform::IncomingMessage;
use crate::relay::Directory;

const NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

/// Authorizes chats listed in a Notion database.
///
/// A chat is allowed when at least one page has its chat ID property
/// (a rich text column) exactly equal to the chat ID.
pub struct NotionDirectory {
    client: reqwest::Client,
    config: NotionConfig,
}

impl NotionDirectory {
    pub fn new(config: NotionConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Notion HTTP client")?;
        Ok(Self { client, config })
    }

    fn query_url(&self) -> String {
        format!(
            "{}/databases/{}/query",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.database_id
        )
    }

    fn query_body(&self, chat_id: i64) -> serde_json::Value {
        json!({
            "filter": {
                "property": self.config.chat_id_property,
                "rich_text": { "equals": chat_id.to_string() }
            },
            "page_size": 1
        })
    }
}

#[async_trait]
impl Directory for NotionDirectory {
    async fn is_authorized(&self, msg: &IncomingMessage) -> Result<bool> {
        let url = self.query_url();
        debug!("Querying Notion directory for chat {}", msg.chat_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&self.query_body(msg.chat_id))
            .send()
            .await
            .context("Failed to send request to Notion")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!("Notion API error: {} - {}", status, error_body);
            return Ok(false);
        }

        let body: QueryResponse = response
            .json()
            .await
            .context("Failed to parse Notion response")?;

        Ok(!body.results.is_empty())
    }
}
