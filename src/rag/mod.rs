//! Retrieval-augmented question answering over the indexed documents.

pub mod prompt;
pub mod service;
pub mod types;

pub use prompt::{PROMPT_TEMPLATE, REFUSAL, compose, join_context};
pub use service::{AnswerApi, AnswerService, AnswerSettings};
pub use types::{Answer, AnswerError, QueryStage, RetrievedChunk};
