//! Query service routes.

use crate::api::health;
use crate::rag::{AnswerApi, AnswerError};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Build the router of the query service.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnswerApi + 'static,
{
    Router::new()
        .route("/", get(catalog))
        .route("/health", get(health))
        .route("/api/query", post(query::<S>))
        .with_state(service)
}

/// Request body for `POST /api/query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Free-text user question.
    pub query: String,
}

/// Response body for `POST /api/query`; on failure `error` is set and the rest is empty.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// Model answer.
    pub answer: String,
    /// Pages of the retrieved chunks in rank order.
    pub page_numbers: Vec<u32>,
    /// Failure description.
    pub error: Option<String>,
}

impl QueryResponse {
    fn failure(status: StatusCode, message: String) -> Response {
        let body = Self {
            error: Some(message),
            ..Self::default()
        };
        (status, Json(body)).into_response()
    }
}

/// Answer a query with retrieval-augmented generation.
async fn query<S>(
    State(service): State<Arc<S>>,
    request: Result<Json<QueryRequest>, JsonRejection>,
) -> Response
where
    S: AnswerApi,
{
    let Json(QueryRequest { query }) = match request {
        Ok(request) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected query body");
            return QueryResponse::failure(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };
    tracing::info!(query = %query, "Received query");

    match service.answer(&query).await {
        Ok(answer) => {
            tracing::info!(pages = ?answer.page_numbers, "Query processed");
            Json(QueryResponse {
                answer: answer.text,
                page_numbers: answer.page_numbers,
                error: None,
            })
            .into_response()
        }
        Err(AnswerError::InvalidInput(message)) => {
            tracing::warn!(%message, "Invalid query");
            QueryResponse::failure(StatusCode::BAD_REQUEST, message)
        }
        Err(error) => {
            tracing::error!(error = %error, "Query failed");
            QueryResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

/// Discovery document listing the service endpoints.
async fn catalog() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Echo Chat API is running",
        "endpoints": {
            "health": "/health",
            "query": "/api/query"
        }
    }))
}
