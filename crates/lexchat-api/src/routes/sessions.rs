use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use lexchat_chat::SessionSnapshot;

use crate::{
    auth::RequestPrincipal,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub state: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub conversation_id: String,
}

/// Open a new chat panel
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    principal: RequestPrincipal,
) -> (StatusCode, Json<SessionResponse>) {
    let (session_id, session) = state.create_session(principal.into_inner()).await;

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            state: session.snapshot(),
        }),
    )
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    principal: RequestPrincipal,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(&session_id, principal.into_inner()).await?;

    Ok(Json(SessionResponse {
        session_id,
        state: session.snapshot(),
    }))
}

/// Close a chat panel
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.remove_session(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(session_id))
    }
}

/// Load a saved conversation into the panel
pub async fn resume_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    principal: RequestPrincipal,
    Json(req): Json<ResumeRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(&session_id, principal.into_inner()).await?;
    session.resume(&req.conversation_id).await?;

    Ok(Json(SessionResponse {
        session_id,
        state: session.snapshot(),
    }))
}

/// Clear the panel so the next message opens a new conversation
pub async fn new_conversation(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    principal: RequestPrincipal,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(&session_id, principal.into_inner()).await?;
    session.start_new_conversation()?;

    Ok(Json(SessionResponse {
        session_id,
        state: session.snapshot(),
    }))
}
