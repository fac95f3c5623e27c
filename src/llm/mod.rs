//! Chat-completion clients for the hosted language model.

pub mod openrouter;
pub mod retry;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use openrouter::OpenRouterClient;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Upstream kept answering HTTP 429 for every attempt.
    #[error("Language model is rate limited; gave up after {attempts} attempts")]
    RateLimited {
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// Transport failure, including per-attempt timeouts.
    #[error("Language model request failed: {0}")]
    Request(String),
    /// Upstream answered with a non-success status other than 429.
    #[error("Language model returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },
    /// Response could not be decoded or contained no choices.
    #[error("Malformed language model response: {0}")]
    InvalidResponse(String),
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the conversation.
    System,
    /// End-user input.
    User,
}

/// One message of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Who is speaking.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Parameters of a single completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Conversation to complete.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, provider default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Output token cap, provider default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the content of the first completion choice.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}
