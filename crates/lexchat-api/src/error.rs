use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use lexchat_chat::TurnError;
use lexchat_llm::RelayError;
use lexchat_persist::PersistError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Missing or invalid credentials")]
    Unauthorized,

    #[error("Chat function is not enabled")]
    RelayDisabled,

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Chat turn error: {0}")]
    Turn(#[from] TurnError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),
}

fn persist_status(error: &PersistError) -> (StatusCode, String) {
    match error {
        PersistError::ConversationNotFound(_) | PersistError::BookmarkNotFound(_) => {
            (StatusCode::NOT_FOUND, error.to_string())
        }
        PersistError::Forbidden(_) => (StatusCode::FORBIDDEN, "Access denied".to_string()),
        PersistError::Unauthenticated => {
            (StatusCode::UNAUTHORIZED, "Sign in to access saved data".to_string())
        }
        PersistError::InvalidId(_) => (StatusCode::BAD_REQUEST, error.to_string()),
        _ => {
            tracing::error!("Persistence error: {}", error);
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::SessionNotFound(_) | ApiError::RelayDisabled => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Persist(ref e) => persist_status(e),
            ApiError::Turn(ref e) => match e {
                TurnError::Busy => (StatusCode::CONFLICT, e.to_string()),
                TurnError::EmptyMessage => (StatusCode::BAD_REQUEST, e.to_string()),
                TurnError::Persist(inner) => persist_status(inner),
                TurnError::Transport(_) | TurnError::Abandoned => {
                    tracing::error!("Chat turn error: {}", e);
                    (StatusCode::BAD_GATEWAY, "Assistant unavailable".to_string())
                }
            },
            ApiError::Relay(ref e) => match e {
                RelayError::RateLimited => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Rate limit exceeded, please try again later".to_string(),
                ),
                RelayError::PaymentRequired => (
                    StatusCode::PAYMENT_REQUIRED,
                    "Usage credits exhausted".to_string(),
                ),
                _ => {
                    tracing::error!("Relay error: {}", e);
                    (StatusCode::BAD_GATEWAY, "Upstream model error".to_string())
                }
            },
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
