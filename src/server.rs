use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Router,
};
use tracing::{debug, error, info, warn};

use crate::error::WebhookError;
use crate::platform::telegram;
use crate::relay::Relay;

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared application state
pub struct AppState {
    relay: Relay,
    secret_token: Option<String>,
}

impl AppState {
    pub fn new(relay: Relay, secret_token: Option<String>) -> Self {
        Self {
            relay,
            secret_token,
        }
    }
}

/// Build the webhook router. Only POST is routed, so any other method on
/// the webhook path is answered with 405.
pub fn router(state: Arc<AppState>, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(handle_webhook))
        .with_state(state)
}

/// Serve the webhook until Ctrl-C
pub async fn run(state: Arc<AppState>, listen_addr: &str, webhook_path: &str) -> Result<()> {
    let app = router(state, webhook_path);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {listen_addr}"))?;

    info!("Listening for Telegram updates on {}{}", listen_addr, webhook_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
        .context("Server error")?;

    Ok(())
}

/// Resolves once `signal` fires. If the handler could not be installed the
/// server keeps running instead of stopping immediately.
async fn shutdown_on<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, WebhookError> {
    if let Some(expected) = state.secret_token.as_deref() {
        let observed = headers
            .get(SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        if observed != expected {
            warn!("Rejected update with invalid secret token");
            return Err(WebhookError::Forbidden);
        }
    }

    let incoming = match telegram::parse_update(&body) {
        Ok(Some(msg)) => msg,
        Ok(None) => {
            debug!("Ignoring update without message text");
            return Ok("OK");
        }
        Err(e) => {
            error!("Failed to parse update: {}", e);
            return Err(e.into());
        }
    };

    let outcome = state.relay.handle(&incoming).await;
    debug!("Update from chat {} finished: {:?}", incoming.chat_id, outcome);

    Ok("OK")
}
