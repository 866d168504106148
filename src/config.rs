use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub github: GithubConfig,
    /// When present, every sender is checked against this Notion database.
    #[serde(default)]
    pub notion: Option<NotionConfig>,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` header.
    #[serde(default)]
    pub secret_token: Option<String>,
    /// Bot API server, when not `https://api.telegram.org`.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Static allowlist, used only when no `[notion]` directory is configured.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_github_api")]
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotionConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_chat_id_property")]
    pub chat_id_property: String,
    #[serde(default = "default_notion_api")]
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_event_type() -> String {
    "telegram_command".to_string()
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_chat_id_property() -> String {
    "Telegram Chat ID".to_string()
}

fn default_notion_api() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            webhook_path: default_webhook_path(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: String::new(),
            event_type: default_event_type(),
            api_base_url: default_github_api(),
        }
    }
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            database_id: String::new(),
            chat_id_property: default_chat_id_property(),
            api_base_url: default_notion_api(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load the TOML file if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override file values with whatever `lookup` returns for the known
    /// environment variables. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("RELAY_LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Some(v) = get("TG_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = get("TELEGRAM_SECRET_TOKEN") {
            self.telegram.secret_token = Some(v);
        }
        if let Some(v) = get("GITHUB_OWNER") {
            self.github.owner = v;
        }
        if let Some(v) = get("GITHUB_REPO") {
            self.github.repo = v;
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.github.token = v;
        }

        let notion_token = get("NOTION_TOKEN");
        let notion_db = get("NOTION_DATABASE_ID");
        if notion_token.is_some() || notion_db.is_some() {
            let notion = self.notion.get_or_insert_with(NotionConfig::default);
            if let Some(v) = notion_token {
                notion.token = v;
            }
            if let Some(v) = notion_db {
                notion.database_id = v;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!("telegram.bot_token is not set (or TG_BOT_TOKEN)");
        }
        if self.github.owner.is_empty() || self.github.repo.is_empty() {
            anyhow::bail!("github.owner and github.repo must be set (or GITHUB_OWNER / GITHUB_REPO)");
        }
        if self.github.token.is_empty() {
            anyhow::bail!("github.token is not set (or GITHUB_TOKEN)");
        }
        if let Some(notion) = &self.notion {
            if notion.token.is_empty() || notion.database_id.is_empty() {
                anyhow::bail!(
                    "[notion] requires both token and database_id (or NOTION_TOKEN / NOTION_DATABASE_ID)"
                );
            }
        }
        if !self.server.webhook_path.starts_with('/') {
            anyhow::bail!(
                "server.webhook_path must start with '/': {}",
                self.server.webhook_path
            );
        }
        Ok(())
    }

    /// The configured webhook secret, ignoring an empty string.
    pub fn secret_token(&self) -> Option<&str> {
        self.telegram
            .secret_token
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}
