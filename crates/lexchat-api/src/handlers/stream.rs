use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

use lexchat_chat::ChatEvent;

use crate::{auth::RequestPrincipal, error::ApiResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

fn to_sse(event: ChatEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(&event)
        .unwrap_or_else(|e| {
            tracing::error!("Failed to serialize turn event: {}", e);
            Event::default().event("error").data("{}")
        })
}

/// Send a message and stream the turn as Server-Sent Events
///
/// Fails with 409 while the session is still streaming a previous reply.
/// Closing the connection abandons the turn.
pub async fn send_message_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    principal: RequestPrincipal,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = state.session(&session_id, principal.into_inner()).await?;
    let events = session.spawn_turn(req.content)?;

    tracing::debug!(%session_id, "Streaming chat turn");

    let sse_stream = ReceiverStream::new(events).map(|event| Ok::<Event, Infallible>(to_sse(event)));

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}
