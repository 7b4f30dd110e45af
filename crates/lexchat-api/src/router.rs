use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::Config,
    handlers::{relay, stream},
    middleware::logging,
    routes::{bookmarks, conversations, health, sessions},
    state::AppState,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Server-side chat function
        .route("/chat", post(relay::chat))
        // Sessions
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/:session_id",
            get(sessions::get_session).delete(sessions::close_session),
        )
        .route("/sessions/:session_id/resume", post(sessions::resume_session))
        .route("/sessions/:session_id/new", post(sessions::new_conversation))
        .route("/sessions/:session_id/messages", post(stream::send_message_stream))
        // Conversations
        .route("/conversations", get(conversations::list_conversations))
        .route("/conversations/:conversation_id/messages", get(conversations::list_messages))
        // Bookmarks
        .route(
            "/bookmarks",
            get(bookmarks::list_bookmarks).post(bookmarks::create_bookmark),
        )
        .route("/bookmarks/:bookmark_id", delete(bookmarks::delete_bookmark));

    api_routes
        .layer(middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(Duration::from_secs(state.config.server.timeout_secs)))
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if !config.cors.enabled {
        return CorsLayer::permissive();
    }

    let mut cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    if config.cors.origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .cors
            .origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        cors = cors.allow_origin(AllowOrigin::list(origins));
    }

    cors
}
