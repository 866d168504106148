use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::debug;

use crate::platform::IncomingMessage;
use crate::relay::ReplySender;

// Only the fields the relay reads. Everything is optional so photos, edits
// and other update kinds deserialize and are then ignored.
#[derive(Debug, Deserialize)]
struct WebhookUpdate {
    message: Option<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    chat: Option<WebhookChat>,
    from: Option<WebhookUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct WebhookUser {
    id: u64,
    first_name: Option<String>,
}

/// Parse a webhook body.
///
/// Returns `Err` only when the body is not JSON at all. A JSON body that is
/// not a text message with chat and sender yields `Ok(None)`.
pub fn parse_update(body: &[u8]) -> Result<Option<IncomingMessage>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_slice(body)?;

    let update: WebhookUpdate = match serde_json::from_value(value) {
        Ok(update) => update,
        Err(e) => {
            debug!("Update does not have the expected shape: {}", e);
            return Ok(None);
        }
    };

    let Some(message) = update.message else {
        return Ok(None);
    };
    let (Some(text), Some(chat), Some(from)) = (message.text, message.chat, message.from) else {
        return Ok(None);
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    Ok(Some(IncomingMessage {
        platform: "telegram".to_string(),
        chat_id: chat.id,
        user_id: from.id,
        user_name: from.first_name.filter(|n| !n.is_empty()),
        text: text.to_string(),
    }))
}

/// Sends replies through the Telegram Bot API with HTML formatting.
pub struct TelegramReplier {
    bot: Bot,
}

impl TelegramReplier {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot: Bot::new(bot_token),
        }
    }

    /// Send through a Bot API server other than `api.telegram.org`.
    pub fn with_api_url(bot_token: &str, api_url: &str) -> Result<Self> {
        let url = reqwest::Url::parse(api_url)
            .with_context(|| format!("Invalid Telegram API URL: {}", api_url))?;
        Ok(Self {
            bot: Bot::new(bot_token).set_api_url(url),
        })
    }
}

#[async_trait]
impl ReplySender for TelegramReplier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .with_context(|| format!("Failed to send Telegram message to chat {}", chat_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        extract::State,
        http::{StatusCode, Uri},
        Router,
    };
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_text_message() {
        let body = br#"{
            "update_id": 1,
            "message": {
                "message_id": 7,
                "chat": {"id": -100123, "type": "group"},
                "from": {"id": 111, "is_bot": false, "first_name": "An"},
                "text": "  /daily  "
            }
        }"#;

        let msg = parse_update(body).unwrap().unwrap();
        assert_eq!(msg.platform, "telegram");
        assert_eq!(msg.chat_id, -100123);
        assert_eq!(msg.user_id, 111);
        assert_eq!(msg.user_name.as_deref(), Some("An"));
        assert_eq!(msg.text, "/daily");
    }

    #[test]
    fn test_missing_first_name_is_none() {
        let body = br#"{"message":{"chat":{"id":5},"from":{"id":5},"text":"/sleep"}}"#;
        let msg = parse_update(body).unwrap().unwrap();
        assert_eq!(msg.user_name, None);
        assert_eq!(msg.display_name(), "you");
    }

    #[test]
    fn test_non_text_updates_are_ignored() {
        let photo = br#"{"message":{"chat":{"id":5},"from":{"id":5},"photo":[]}}"#;
        assert!(parse_update(photo).unwrap().is_none());

        let edit = br#"{"edited_message":{"chat":{"id":5},"from":{"id":5},"text":"/daily"}}"#;
        assert!(parse_update(edit).unwrap().is_none());

        assert!(parse_update(b"{}").unwrap().is_none());
        assert!(parse_update(b"[1, 2]").unwrap().is_none());
        assert!(parse_update(b"null").unwrap().is_none());

        let empty = br#"{"message":{"chat":{"id":5},"from":{"id":5},"text":""}}"#;
        assert!(parse_update(empty).unwrap().is_none());

        let blank = br#"{"message":{"chat":{"id":5},"from":{"id":5},"text":"  \n "}}"#;
        assert!(parse_update(blank).unwrap().is_none());
    }

    #[test]
    fn test_missing_sender_or_chat_is_ignored() {
        let no_from = br#"{"message":{"chat":{"id":5},"text":"/daily"}}"#;
        assert!(parse_update(no_from).unwrap().is_none());

        let no_chat = br#"{"message":{"from":{"id":5},"text":"/daily"}}"#;
        assert!(parse_update(no_chat).unwrap().is_none());
    }

    #[test]
    fn test_wrong_field_types_are_ignored() {
        let body = br#"{"message":{"chat":{"id":"abc"},"from":{"id":5},"text":"/daily"}}"#;
        assert!(parse_update(body).unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_update(b"not json").is_err());
        assert!(parse_update(b"").is_err());
    }

    type Captured = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

    const SENT_MESSAGE: &str = r#"{
        "ok": true,
        "result": {
            "message_id": 1,
            "date": 1700000000,
            "chat": {"id": 111, "type": "private", "first_name": "A"},
            "from": {"id": 999, "is_bot": true, "first_name": "Coach"},
            "text": "ok"
        }
    }"#;

    const CHAT_NOT_FOUND: &str =
        r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#;

    // Bot API stand-in: records every call and answers with a fixed status and body.
    async fn mock_bot_api(status: StatusCode, reply: &'static str) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .fallback(
                move |State(captured): State<Captured>, uri: Uri, body: Bytes| async move {
                    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
                    captured.lock().unwrap().push((uri.path().to_string(), json));
                    (status, [("content-type", "application/json")], reply)
                },
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    #[tokio::test]
    async fn test_replier_sends_html_message() {
        let (base, captured) = mock_bot_api(StatusCode::OK, SENT_MESSAGE).await;
        let replier = TelegramReplier::with_api_url("test-token", &base).unwrap();

        replier.send(111, "<b>daily</b> started").await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (path, body) = &captured[0];
        assert_eq!(path.to_lowercase(), "/bottest-token/sendmessage");
        assert_eq!(body["chat_id"], 111);
        assert_eq!(body["text"], "<b>daily</b> started");
        assert_eq!(body["parse_mode"], "HTML");
    }

    #[tokio::test]
    async fn test_replier_surfaces_api_error() {
        let (base, captured) = mock_bot_api(StatusCode::BAD_REQUEST, CHAT_NOT_FOUND).await;
        let replier = TelegramReplier::with_api_url("test-token", &base).unwrap();

        let err = replier.send(-5, "hello").await.unwrap_err();

        assert!(err.to_string().contains("chat -5"));
        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        assert!(TelegramReplier::with_api_url("t", "not a url").is_err());
    }
}
