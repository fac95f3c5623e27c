//! Flashcard model and parsing of model output.

use serde::{Deserialize, Serialize};

use super::StudyError;

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Concise prompt shown on the front of the card.
    pub question: String,
    /// Answer shown on the back.
    pub answer: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlashcardPayload {
    Cards(Vec<Flashcard>),
    Wrapped { flashcards: Vec<Flashcard> },
}

/// Parse a model reply into flashcards.
///
/// Models frequently wrap JSON in a markdown code fence; the fence is removed before parsing.
/// A top-level `{"flashcards": [...]}` object is accepted alongside a bare array.
pub fn parse_flashcards(content: &str) -> Result<Vec<Flashcard>, StudyError> {
    let body = strip_code_fence(content);
    match serde_json::from_str::<FlashcardPayload>(body) {
        Ok(FlashcardPayload::Cards(cards)) | Ok(FlashcardPayload::Wrapped { flashcards: cards }) => {
            Ok(cards)
        }
        Err(error) => {
            tracing::warn!(error = %error, "Model reply is not a flashcard array");
            Err(StudyError::InvalidFormat)
        }
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.trim_end();
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the info string (`json`, `JSON`, ...) after the opening fence.
    let body = match inner.split_once('\n') {
        Some((info, rest)) if info.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => inner.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim()
}
