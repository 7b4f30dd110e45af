use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use lexchat_persist::{Bookmark, NewBookmark};

use crate::{
    auth::RequestPrincipal,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    principal: RequestPrincipal,
) -> ApiResult<Json<Vec<Bookmark>>> {
    let bookmarks = state.gateway_for(principal.into_inner()).list_bookmarks().await?;
    Ok(Json(bookmarks))
}

pub async fn create_bookmark(
    State(state): State<Arc<AppState>>,
    principal: RequestPrincipal,
    Json(req): Json<NewBookmark>,
) -> ApiResult<(StatusCode, Json<Bookmark>)> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Bookmark title is required".to_string()));
    }

    let bookmark = state.gateway_for(principal.into_inner()).save_bookmark(req).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

pub async fn delete_bookmark(
    State(state): State<Arc<AppState>>,
    Path(bookmark_id): Path<String>,
    principal: RequestPrincipal,
) -> ApiResult<StatusCode> {
    state
        .gateway_for(principal.into_inner())
        .delete_bookmark(&bookmark_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
