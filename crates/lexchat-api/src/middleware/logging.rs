use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::auth::USER_ID_HEADER;

/// Request logging middleware
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let signed_in = req.headers().contains_key(USER_ID_HEADER);
    let start = Instant::now();

    let response = next.run(req).await;

    // For SSE responses this measures time to first byte, not stream length.
    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status(),
        signed_in,
        duration_ms = %start.elapsed().as_millis(),
        "Request processed"
    );

    response
}
