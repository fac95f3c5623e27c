use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use echo_study::{
    api,
    config::{Config, EmbeddingProvider},
    embedding::HashingEmbeddingClient,
    llm::OpenRouterClient,
    processing::{ChunkerSettings, Document, IngestionService, Page},
    qdrant::QdrantService,
    rag::{AnswerService, AnswerSettings, REFUSAL},
};
use httpmock::{Method::POST, Method::PUT, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;

const COLLECTION: &str = "echo-chat-index";

fn config(qdrant: &MockServer, llm: &MockServer) -> Config {
    Config {
        openrouter_api_key: "sk-integration".into(),
        llm_base_url: llm.base_url(),
        chat_model: "chat-model".into(),
        study_model: "study-model".into(),
        llm_timeout_secs: 5,
        llm_max_attempts: 2,
        llm_backoff_base_ms: 1,
        qdrant_url: qdrant.base_url(),
        qdrant_api_key: "qdrant-key".into(),
        index_name: COLLECTION.into(),
        index_namespace: "pdf-namespace".into(),
        embedding_provider: EmbeddingProvider::Hashing,
        embedding_model: "hashing".into(),
        embedding_dimension: 384,
        ollama_url: "http://127.0.0.1:11434".into(),
        retrieval_top_k: 3,
        chunk_size: 1000,
        chunk_overlap: 200,
        server_port: None,
    }
}

fn chat_router(config: &Config) -> Router {
    let service = AnswerService::new(
        Arc::new(HashingEmbeddingClient::new(config.embedding_dimension)),
        Arc::new(QdrantService::new(config).expect("qdrant client")),
        Arc::new(OpenRouterClient::new(config).expect("llm client")),
        AnswerSettings::from_config(config),
    );
    api::create_chat_router(Arc::new(service))
}

async fn ask(app: Router, query: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/query")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "query": query }).to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn query_flows_through_index_and_model() {
    let qdrant = MockServer::start_async().await;
    let llm = MockServer::start_async().await;

    let search = qdrant
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/collections/{COLLECTION}/points/query"))
                .header("api-key", "qdrant-key")
                .body_contains("\"limit\":3")
                .body_contains("pdf-namespace");
            then.status(200).json_body(json!({
                "result": { "points": [
                    { "id": "a", "score": 0.91, "payload": { "chunk_text": "Ownership moves values.", "page": 3 } },
                    { "id": "b", "score": 0.84, "payload": { "chunk_text": "Borrowing lends them.", "page": 1 } },
                    { "id": "c", "score": 0.80, "payload": { "chunk_text": "No page metadata here." } }
                ]},
                "status": "ok"
            }));
        })
        .await;
    let completion = llm
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-integration")
                .body_contains("Ownership moves values.\\n\\nBorrowing lends them.")
                .body_contains("Query: What is ownership?");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Ownership moves values between bindings." } }]
            }));
        })
        .await;

    let (status, body) = ask(chat_router(&config(&qdrant, &llm)), "What is ownership?").await;

    search.assert_async().await;
    completion.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "answer": "Ownership moves values between bindings.",
            "page_numbers": [3, 1, 0],
            "error": null
        })
    );
}

#[tokio::test]
async fn empty_retrieval_still_asks_the_model() {
    let qdrant = MockServer::start_async().await;
    let llm = MockServer::start_async().await;

    qdrant
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/collections/{COLLECTION}/points/query"));
            then.status(200)
                .json_body(json!({ "result": { "points": [] }, "status": "ok" }));
        })
        .await;
    let completion = llm
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("Context: \\nQuery: What is in chapter 9?");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "content": REFUSAL } }]
            }));
        })
        .await;

    let (status, body) = ask(chat_router(&config(&qdrant, &llm)), "What is in chapter 9?").await;

    completion.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], REFUSAL);
    assert_eq!(body["page_numbers"], json!([]));
}

#[tokio::test]
async fn persistent_rate_limiting_becomes_internal_error() {
    let qdrant = MockServer::start_async().await;
    let llm = MockServer::start_async().await;

    qdrant
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/collections/{COLLECTION}/points/query"));
            then.status(200)
                .json_body(json!({ "result": { "points": [] }, "status": "ok" }));
        })
        .await;
    let completion = llm
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429).body("rate limited");
        })
        .await;

    let (status, body) = ask(chat_router(&config(&qdrant, &llm)), "Hello!").await;

    completion.assert_hits_async(2).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["answer"], "");
    assert_eq!(body["page_numbers"], json!([]));
    assert!(body["error"].as_str().expect("error").contains("rate limited"));
}

#[tokio::test]
async fn empty_query_never_leaves_the_process() {
    let qdrant = MockServer::start_async().await;
    let llm = MockServer::start_async().await;
    let search = qdrant
        .mock_async(|when, then| {
            when.method(POST);
            then.status(500);
        })
        .await;
    let completion = llm
        .mock_async(|when, then| {
            when.method(POST);
            then.status(500);
        })
        .await;

    let (status, body) = ask(chat_router(&config(&qdrant, &llm)), "   ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query cannot be empty");
    search.assert_hits_async(0).await;
    completion.assert_hits_async(0).await;
}

#[tokio::test]
async fn ingestion_writes_namespaced_points() {
    let qdrant = MockServer::start_async().await;
    let llm = MockServer::start_async().await;
    let upsert = qdrant
        .mock_async(|when, then| {
            when.method(PUT)
                .path(format!("/collections/{COLLECTION}/points"))
                .query_param("wait", "true")
                .header("api-key", "qdrant-key")
                .body_contains("\"namespace\":\"pdf-namespace\"")
                .body_contains("\"record_id\":\"lecture-1_0\"")
                .body_contains("\"chunk_text\":\"Ownership moves values.\"");
            then.status(200)
                .json_body(json!({ "result": { "status": "completed" }, "status": "ok" }));
        })
        .await;

    let config = config(&qdrant, &llm);
    let service = IngestionService::new(
        Arc::new(HashingEmbeddingClient::new(config.embedding_dimension)),
        Arc::new(QdrantService::new(&config).expect("qdrant client")),
        ChunkerSettings::default(),
        config.index_namespace.clone(),
    );
    let document = Document {
        id: "lecture-1".into(),
        pages: vec![
            Page {
                number: 0,
                text: "Ownership moves values.".into(),
            },
            Page {
                number: 1,
                text: "Borrowing lends them.".into(),
            },
        ],
    };

    let outcome = service.ingest_document(&document).await.expect("ingest");

    upsert.assert_hits_async(1).await;
    assert!(outcome.is_complete());
    assert_eq!(outcome.chunk_count, 2);
    assert_eq!(service.metrics_snapshot().chunks_indexed, 2);
}
