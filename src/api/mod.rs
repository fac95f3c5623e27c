//! HTTP surfaces.
//!
//! - [`chat`]: the query service (`POST /api/query`, `GET /health`, `GET /`).
//! - [`study`]: PDF uploads turned into markdown notes or flashcards.
//!
//! Handlers translate service errors into `{"error": ...}` JSON bodies at the boundary.

pub mod chat;
pub mod study;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub use chat::create_router as create_chat_router;
pub use study::{create_flashcards_router, create_notes_router};

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: &'static str,
    /// Current time in RFC 3339.
    pub timestamp: String,
}

/// Liveness check shared by every service.
pub async fn health() -> Json<HealthResponse> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(HealthResponse {
        status: "healthy",
        timestamp,
    })
}

/// Error rendered as `{"error": message}` with the given status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Response with an arbitrary status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 response.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 500 response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
