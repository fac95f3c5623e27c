//! Study aids generated from extracted PDF text: markdown notes and flashcards.

pub mod flashcards;

use crate::{
    config::Config,
    llm::{ChatMessage, ChatModel, ChatRequest, LlmError},
    processing::{PdfError, pdf::extract_document},
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use flashcards::{Flashcard, parse_flashcards};

/// System prompt for markdown study notes.
pub const NOTES_SYSTEM_PROMPT: &str = "You are an AI that processes study notes for engineering students. \
Extract key points and structure the content in a markdown format. \
Remove any irrelevant layout texts from the PDF.";

/// System prompt for flashcard generation.
pub const FLASHCARDS_SYSTEM_PROMPT: &str = "You are an AI that processes study materials and creates flashcards. \
Extract key concepts and create question-answer pairs. \
Format the output as a JSON array of flashcards with 'question' and 'answer' fields. \
Make the questions concise and answers comprehensive but clear.";

/// Failures while generating study aids.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Upload could not be read as a PDF.
    #[error(transparent)]
    Pdf(#[from] PdfError),
    /// Extracted text was empty.
    #[error("No text could be extracted from the PDF")]
    NoText,
    /// Language model request failed.
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// Flashcard reply was not valid JSON.
    #[error("Invalid response format from API")]
    InvalidFormat,
}

/// Study operations on uploaded PDFs, as consumed by the HTTP surface.
#[async_trait]
pub trait StudyApi: Send + Sync {
    /// Extract the PDF and restructure its text into markdown notes.
    async fn notes_from_pdf(&self, pdf: Vec<u8>) -> Result<String, StudyError>;

    /// Extract the PDF and generate flashcards from its text.
    async fn flashcards_from_pdf(&self, pdf: Vec<u8>) -> Result<Vec<Flashcard>, StudyError>;
}

/// Generates notes and flashcards through the configured chat model.
pub struct StudyService {
    model: Arc<dyn ChatModel>,
    model_name: String,
}

impl StudyService {
    /// Wire the service to a chat model.
    pub fn new(model: Arc<dyn ChatModel>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }

    /// Build the service with the study model named in configuration.
    pub fn from_config(model: Arc<dyn ChatModel>, config: &Config) -> Self {
        Self::new(model, config.study_model.clone())
    }

    /// Restructure raw PDF text into markdown notes.
    pub async fn summarize(&self, text: &str) -> Result<String, StudyError> {
        ensure_text(text)?;
        tracing::info!(model = %self.model_name, chars = text.len(), "Generating study notes");
        let notes = self
            .model
            .complete(self.request(NOTES_SYSTEM_PROMPT, text.to_string()))
            .await?;
        Ok(notes)
    }

    /// Generate question/answer flashcards from raw PDF text.
    pub async fn flashcards(&self, text: &str) -> Result<Vec<Flashcard>, StudyError> {
        ensure_text(text)?;
        tracing::info!(model = %self.model_name, chars = text.len(), "Generating flashcards");
        let reply = self
            .model
            .complete(self.request(
                FLASHCARDS_SYSTEM_PROMPT,
                format!("Create flashcards from this text: {text}"),
            ))
            .await?;
        let cards = parse_flashcards(&reply)?;
        tracing::debug!(cards = cards.len(), "Parsed flashcards");
        Ok(cards)
    }

    fn request(&self, system: &str, user: String) -> ChatRequest {
        ChatRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: None,
            max_tokens: None,
        }
    }
}

#[async_trait]
impl StudyApi for StudyService {
    async fn notes_from_pdf(&self, pdf: Vec<u8>) -> Result<String, StudyError> {
        let text = extract_text(pdf).await?;
        self.summarize(&text).await
    }

    async fn flashcards_from_pdf(&self, pdf: Vec<u8>) -> Result<Vec<Flashcard>, StudyError> {
        let text = extract_text(pdf).await?;
        self.flashcards(&text).await
    }
}

async fn extract_text(pdf: Vec<u8>) -> Result<String, StudyError> {
    let document = extract_document("upload", pdf).await?;
    Ok(document.full_text())
}

fn ensure_text(text: &str) -> Result<(), StudyError> {
    if text.trim().is_empty() {
        return Err(StudyError::NoText);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Chat model returning a fixed reply and recording requests.
    struct CannedModel {
        reply: Result<String, fn() -> LlmError>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl CannedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: fn() -> LlmError) -> Self {
            Self {
                reply: Err(error),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<ChatRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
            self.requests.lock().expect("requests lock").push(request);
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(error) => Err(error()),
            }
        }
    }

    #[tokio::test]
    async fn notes_use_system_prompt_and_raw_text() {
        let model = Arc::new(CannedModel::replying("# Notes"));
        let service = StudyService::new(model.clone(), "study-model");

        let notes = service.summarize("Lecture text").await.expect("notes");

        assert_eq!(notes, "# Notes");
        let calls = model.calls();
        assert_eq!(calls[0].model, "study-model");
        assert_eq!(calls[0].messages[0].role, Role::System);
        assert_eq!(calls[0].messages[0].content, NOTES_SYSTEM_PROMPT);
        assert_eq!(calls[0].messages[1].content, "Lecture text");
    }

    #[tokio::test]
    async fn flashcards_are_parsed_from_reply() {
        let model = Arc::new(CannedModel::replying(
            "```json\n[{\"question\":\"Q1\",\"answer\":\"A1\"},{\"question\":\"Q2\",\"answer\":\"A2\"}]\n```",
        ));
        let service = StudyService::new(model.clone(), "study-model");

        let cards = service.flashcards("Lecture text").await.expect("cards");

        assert_eq!(cards.len(), 2);
        assert_eq!(
            model.calls()[0].messages[1].content,
            "Create flashcards from this text: Lecture text"
        );
    }

    #[tokio::test]
    async fn blank_text_skips_the_model() {
        let model = Arc::new(CannedModel::replying("unused"));
        let service = StudyService::new(model.clone(), "study-model");

        let error = service.summarize(" \n ").await.expect_err("no text");

        assert!(matches!(error, StudyError::NoText));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn unreadable_upload_is_a_pdf_error() {
        let model = Arc::new(CannedModel::replying("unused"));
        let error = StudyService::new(model.clone(), "m")
            .notes_from_pdf(b"not a pdf".to_vec())
            .await
            .expect_err("bad pdf");
        assert!(matches!(error, StudyError::Pdf(_)));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn llm_errors_propagate() {
        let model = Arc::new(CannedModel::failing(|| LlmError::RateLimited { attempts: 5 }));
        let error = StudyService::new(model, "m")
            .flashcards("text")
            .await
            .expect_err("rate limited");
        assert!(matches!(error, StudyError::Llm(LlmError::RateLimited { attempts: 5 })));
    }
}
