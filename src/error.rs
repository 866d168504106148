use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failures that are reported to the webhook caller as an HTTP status.
/// Everything else is answered with `200 OK`.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook secret token mismatch")]
    Forbidden,
    #[error("malformed update payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Forbidden => StatusCode::FORBIDDEN,
            WebhookError::MalformedPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = match &self {
            WebhookError::Forbidden => "Forbidden",
            WebhookError::MalformedPayload(_) => "Error",
        };
        (self.status(), body).into_response()
    }
}
