mod commands;
mod config;
mod error;
mod github;
mod notion;
mod platform;
mod relay;
mod server;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::github::GithubDispatcher;
use crate::notion::NotionDirectory;
use crate::platform::telegram::TelegramReplier;
use crate::relay::{AllowList, Directory, Relay};
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dispatchbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!(
        "  Dispatch target: {}/{} ({})",
        config.github.owner, config.github.repo, config.github.event_type
    );
    info!("  Webhook secret: {}", config.secret_token().is_some());

    let timeout = Duration::from_secs(config.http.timeout_secs);

    let directory: Option<Arc<dyn Directory>> = match &config.notion {
        Some(notion) => {
            info!("  Authorization: Notion database {}", notion.database_id);
            Some(Arc::new(NotionDirectory::new(notion.clone(), timeout)?))
        }
        None if !config.telegram.allowed_user_ids.is_empty() => {
            info!(
                "  Authorization: allowed users {:?}",
                config.telegram.allowed_user_ids
            );
            Some(Arc::new(AllowList::new(
                config.telegram.allowed_user_ids.clone(),
            )))
        }
        None => {
            info!("  Authorization: disabled");
            None
        }
    };

    let trigger = Arc::new(GithubDispatcher::new(config.github.clone(), timeout)?);
    let replies = match &config.telegram.api_url {
        Some(api_url) => {
            info!("  Telegram API: {}", api_url);
            Arc::new(TelegramReplier::with_api_url(
                &config.telegram.bot_token,
                api_url,
            )?)
        }
        None => Arc::new(TelegramReplier::new(&config.telegram.bot_token)),
    };
    let relay = Relay::new(directory, trigger, replies);

    let state = Arc::new(AppState::new(
        relay,
        config.secret_token().map(str::to_string),
    ));

    info!("Relay is starting...");
    server::run(state, &config.server.listen_addr, &config.server.webhook_path).await?;

    Ok(())
}
