use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use lexchat_llm::Message;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<Message>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Server-side chat function
///
/// Puts the assistant's system prompt in front of the conversation and relays
/// the upstream event stream body as is.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RelayRequest>,
) -> ApiResult<Response> {
    let relay = state.relay.as_ref().ok_or(ApiError::RelayDisabled)?;

    let expected = state.config.completion_api_key.as_str();
    match bearer_token(&headers) {
        Some(token) if !expected.is_empty() && token == expected => {}
        _ => return Err(ApiError::Unauthorized),
    }

    if req.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }

    tracing::debug!(messages = req.messages.len(), "Relaying chat request");
    let upstream = relay.open_stream(&req.messages).await?;

    let response_headers = [
        (header::CONTENT_TYPE, "text/event-stream"),
        (header::CACHE_CONTROL, "no-cache"),
    ];
    Ok((response_headers, Body::from_stream(upstream.bytes_stream())).into_response())
}
