pub mod telegram;

/// A text message received from the chat platform
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    /// Platform identifier (e.g., "telegram")
    pub platform: String,
    /// Chat the reply goes back to
    pub chat_id: i64,
    /// Sender's user ID, forwarded to the workflow
    pub user_id: u64,
    /// Display name of the user, if the platform sent one
    pub user_name: Option<String>,
    /// The message text, trimmed
    pub text: String,
}

impl IncomingMessage {
    /// Name to address the user by in replies.
    pub fn display_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or("you")
    }
}
