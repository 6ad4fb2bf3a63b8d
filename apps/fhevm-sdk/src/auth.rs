//! Shared-token middleware for service-to-service calls.
//!
//! When a token is configured, every route except the liveness endpoints must
//! carry it in [`INTERNAL_TOKEN_HEADER`]. The gateway client sends the same
//! header, so API and gateway can share one `INTERNAL_SERVICE_TOKEN`.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const INTERNAL_TOKEN_HEADER: &str = "x-fhevm-internal-token";

const PUBLIC_PATHS: [&str; 2] = ["/health", "/build-info"];

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": "Unauthorized" })),
    )
        .into_response()
}

pub async fn internal_auth(
    State(token): State<Option<String>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected = token.as_deref().filter(|value| !value.is_empty());
    let path = req.uri().path();

    if let Some(expected) = expected {
        if !PUBLIC_PATHS.contains(&path) && presented_token(req.headers()) != Some(expected) {
            tracing::warn!(%path, "rejected request without a valid internal token");
            return unauthorized();
        }
    }

    next.run(req).await
}
