//! PDF upload routes for study notes and flashcards.

use crate::api::{ApiError, health};
use crate::processing::pdf::has_pdf_extension;
use crate::study::{Flashcard, StudyApi, StudyError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "pdf_file";

/// Router of the notes service: `POST /api/process_pdf/`.
pub fn create_notes_router<S>(service: Arc<S>) -> Router
where
    S: StudyApi + 'static,
{
    Router::new()
        .route("/api/process_pdf/", post(process_pdf::<S>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Router of the flashcards service: `POST /api/generate_flashcards/`.
pub fn create_flashcards_router<S>(service: Arc<S>) -> Router
where
    S: StudyApi + 'static,
{
    Router::new()
        .route("/api/generate_flashcards/", post(generate_flashcards::<S>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Success body of `POST /api/process_pdf/`.
#[derive(Debug, Serialize)]
pub struct NotesResponse {
    /// Notes rendered as markdown.
    pub markdown_output: String,
}

async fn process_pdf<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<NotesResponse>, ApiError>
where
    S: StudyApi,
{
    let pdf = read_upload(multipart).await?;
    let markdown_output = service.notes_from_pdf(pdf).await.map_err(study_error)?;
    tracing::info!(chars = markdown_output.len(), "Study notes generated");
    Ok(Json(NotesResponse { markdown_output }))
}

async fn generate_flashcards<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<Flashcard>>, ApiError>
where
    S: StudyApi,
{
    let pdf = read_upload(multipart).await?;
    let cards = service.flashcards_from_pdf(pdf).await.map_err(study_error)?;
    tracing::info!(cards = cards.len(), "Flashcards generated");
    Ok(Json(cards))
}

/// Pull the `pdf_file` field out of the form and check its filename.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<u8>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Request is not a multipart upload");
        ApiError::bad_request("No PDF file uploaded")
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::new(error.status(), error.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if !has_pdf_extension(&filename) {
            tracing::warn!(%filename, "Rejected non-PDF upload");
            return Err(ApiError::bad_request("File is not a PDF"));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|error| ApiError::new(error.status(), error.body_text()))?;
        tracing::info!(%filename, bytes = bytes.len(), "Received PDF upload");
        return Ok(bytes.to_vec());
    }

    Err(ApiError::bad_request("No PDF file uploaded"))
}

fn study_error(error: StudyError) -> ApiError {
    match error {
        StudyError::NoText => ApiError::bad_request(error.to_string()),
        other => {
            tracing::error!(error = %other, "Study request failed");
            ApiError::internal(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "echo-boundary";

    #[derive(Default)]
    struct StubStudy {
        uploads: Mutex<Vec<Vec<u8>>>,
        failure: Option<fn() -> StudyError>,
    }

    impl StubStudy {
        fn failing(failure: fn() -> StudyError) -> Arc<Self> {
            Arc::new(Self {
                failure: Some(failure),
                ..Self::default()
            })
        }

        async fn record(&self, pdf: Vec<u8>) -> Result<(), StudyError> {
            self.uploads.lock().await.push(pdf);
            match self.failure {
                Some(failure) => Err(failure()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl StudyApi for StubStudy {
        async fn notes_from_pdf(&self, pdf: Vec<u8>) -> Result<String, StudyError> {
            self.record(pdf).await?;
            Ok("# Ownership\n- moves values".into())
        }

        async fn flashcards_from_pdf(&self, pdf: Vec<u8>) -> Result<Vec<Flashcard>, StudyError> {
            self.record(pdf).await?;
            Ok(vec![Flashcard {
                question: "What is ownership?".into(),
                answer: "Rules governing memory.".into(),
            }])
        }
    }

    fn multipart_body(field: &str, filename: &str, contents: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload(app: Router, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
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
    async fn notes_are_returned_as_markdown_output() {
        let service = Arc::new(StubStudy::default());
        let (status, body) = upload(
            create_notes_router(service.clone()),
            "/api/process_pdf/",
            multipart_body("pdf_file", "lecture.pdf", b"%PDF-1.4 bytes"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "markdown_output": "# Ownership\n- moves values" }));
        assert_eq!(*service.uploads.lock().await, vec![b"%PDF-1.4 bytes".to_vec()]);
    }

    #[tokio::test]
    async fn flashcards_are_returned_as_array() {
        let (status, body) = upload(
            create_flashcards_router(Arc::new(StubStudy::default())),
            "/api/generate_flashcards/",
            multipart_body("pdf_file", "Lecture.PDF", b"%PDF"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{ "question": "What is ownership?", "answer": "Rules governing memory." }])
        );
    }

    #[tokio::test]
    async fn missing_field_is_rejected() {
        let service = Arc::new(StubStudy::default());
        let (status, body) = upload(
            create_notes_router(service.clone()),
            "/api/process_pdf/",
            multipart_body("document", "lecture.pdf", b"%PDF"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No PDF file uploaded" }));
        assert!(service.uploads.lock().await.is_empty());
    }

    #[tokio::test]
    async fn non_pdf_filename_is_rejected() {
        let (status, body) = upload(
            create_flashcards_router(Arc::new(StubStudy::default())),
            "/api/generate_flashcards/",
            multipart_body("pdf_file", "lecture.docx", b"PK"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "File is not a PDF" }));
    }

    #[tokio::test]
    async fn non_multipart_request_is_rejected() {
        let response = create_notes_router(Arc::new(StubStudy::default()))
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/process_pdf/")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_text_is_bad_request() {
        let (status, body) = upload(
            create_notes_router(StubStudy::failing(|| StudyError::NoText)),
            "/api/process_pdf/",
            multipart_body("pdf_file", "scan.pdf", b"%PDF"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No text could be extracted from the PDF" }));
    }

    #[tokio::test]
    async fn invalid_flashcard_reply_is_internal_error() {
        let (status, body) = upload(
            create_flashcards_router(StubStudy::failing(|| StudyError::InvalidFormat)),
            "/api/generate_flashcards/",
            multipart_body("pdf_file", "lecture.pdf", b"%PDF"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Invalid response format from API" }));
    }

    #[tokio::test]
    async fn upstream_failure_is_internal_error() {
        let (status, body) = upload(
            create_notes_router(StubStudy::failing(|| {
                StudyError::Llm(LlmError::RateLimited { attempts: 5 })
            })),
            "/api/process_pdf/",
            multipart_body("pdf_file", "lecture.pdf", b"%PDF"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().expect("error").contains("rate limited"));
    }
}
