use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::utils::html;
use tracing::{error, info, warn};

use crate::commands::{self, Command, CommandMode};
use crate::platform::IncomingMessage;

/// Delivers a text reply to a chat.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Starts a remote workflow run for a mode.
#[async_trait]
pub trait AutomationTrigger: Send + Sync {
    async fn trigger(&self, mode: CommandMode, user_id: u64) -> Result<()>;
}

/// Decides whether the sender of a message may use the bot.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn is_authorized(&self, msg: &IncomingMessage) -> Result<bool>;
}

/// Static allowlist of Telegram user IDs.
pub struct AllowList {
    user_ids: Vec<u64>,
}

impl AllowList {
    pub fn new(user_ids: Vec<u64>) -> Self {
        Self { user_ids }
    }
}

#[async_trait]
impl Directory for AllowList {
    async fn is_authorized(&self, msg: &IncomingMessage) -> Result<bool> {
        Ok(self.user_ids.contains(&msg.user_id))
    }
}

/// Terminal state of one relayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unauthorized,
    Help,
    Unrecognized,
    Dispatched(CommandMode),
    DispatchFailed(CommandMode),
}

/// Turns an incoming chat message into at most one workflow dispatch and
/// at most two replies.
pub struct Relay {
    directory: Option<Arc<dyn Directory>>,
    trigger: Arc<dyn AutomationTrigger>,
    replies: Arc<dyn ReplySender>,
}

impl Relay {
    pub fn new(
        directory: Option<Arc<dyn Directory>>,
        trigger: Arc<dyn AutomationTrigger>,
        replies: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            directory,
            trigger,
            replies,
        }
    }

    pub async fn handle(&self, msg: &IncomingMessage) -> Outcome {
        info!(
            "Received {} command: {} from {} ({})",
            msg.platform,
            msg.text,
            msg.display_name(),
            msg.user_id
        );

        if !self.authorize(msg).await {
            warn!("Unauthorized chat {} (user {})", msg.chat_id, msg.user_id);
            self.reply(msg.chat_id, &denial_text(msg.chat_id)).await;
            return Outcome::Unauthorized;
        }

        let mode = match commands::parse_command(&msg.text) {
            Some(Command::Help) => {
                self.reply(msg.chat_id, &commands::help_text(msg.user_name.as_deref()))
                    .await;
                return Outcome::Help;
            }
            Some(Command::Run(mode)) => mode,
            None => return Outcome::Unrecognized,
        };

        let name = html::escape(msg.display_name());
        self.reply(
            msg.chat_id,
            &format!("🚀 Running <b>{mode}</b> for {name}... Please wait!"),
        )
        .await;

        match self.trigger.trigger(mode, msg.user_id).await {
            Ok(()) => {
                info!("Dispatched {} for user {}", mode, msg.user_id);
                self.reply(
                    msg.chat_id,
                    &format!("✅ Workflow <b>{mode}</b> started. Your report will arrive shortly."),
                )
                .await;
                Outcome::Dispatched(mode)
            }
            Err(e) => {
                error!("Dispatch of {} failed: {:#}", mode, e);
                self.reply(
                    msg.chat_id,
                    "⚠️ Failed to trigger the GitHub workflow. Please try again.",
                )
                .await;
                Outcome::DispatchFailed(mode)
            }
        }
    }

    async fn authorize(&self, msg: &IncomingMessage) -> bool {
        let Some(directory) = &self.directory else {
            return true;
        };
        match directory.is_authorized(msg).await {
            Ok(allowed) => allowed,
            Err(e) => {
                error!("Authorization lookup failed for chat {}: {:#}", msg.chat_id, e);
                false
            }
        }
    }

    // Reply failures are logged and never reach the webhook caller.
    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.replies.send(chat_id, text).await {
            warn!("Reply to chat {} failed: {:#}", chat_id, e);
        }
    }
}

fn denial_text(chat_id: i64) -> String {
    format!(
        "⛔ You are not authorized to use this bot.\n\
         Ask the administrator to register chat ID <code>{chat_id}</code>."
    )
}
