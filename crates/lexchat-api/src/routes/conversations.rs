use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use lexchat_persist::{Conversation, StoredMessage};

use crate::{auth::RequestPrincipal, error::ApiResult, state::AppState};

const MAX_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub conversation: Conversation,
    pub messages: Vec<StoredMessage>,
}

/// Recent conversations of the caller, most recently active first
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    principal: RequestPrincipal,
    Query(query): Query<ListConversationsQuery>,
) -> ApiResult<Json<ListConversationsResponse>> {
    let limit = query
        .limit
        .unwrap_or(state.config.chat.recent_limit)
        .clamp(1, MAX_LIMIT);

    let conversations = state
        .gateway_for(principal.into_inner())
        .recent_conversations(limit)
        .await?;

    Ok(Json(ListConversationsResponse { conversations }))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    principal: RequestPrincipal,
) -> ApiResult<Json<TranscriptResponse>> {
    let gateway = state.gateway_for(principal.into_inner());
    let conversation = gateway.get_conversation(&conversation_id).await?;
    let messages = gateway.load_transcript(&conversation_id).await?;

    Ok(Json(TranscriptResponse {
        conversation,
        messages,
    }))
}
