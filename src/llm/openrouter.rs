//! OpenRouter (OpenAI-compatible) chat-completions client.
//!
//! Every attempt is bounded by the configured network timeout. HTTP 429 responses are retried
//! according to the [`RetryPolicy`]; every other failure is returned straight away.

use super::retry::{AttemptError, RetryError, RetryPolicy, Sleeper, TokioSleeper, retry_with_backoff};
use super::{ChatModel, ChatRequest, LlmError};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Chat-completions client with rate-limit backoff.
pub struct OpenRouterClient {
    http: Client,
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    /// Build a client from configuration, sleeping on the tokio timer between retries.
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let policy = RetryPolicy::exponential(
            config.llm_max_attempts,
            Duration::from_millis(config.llm_backoff_base_ms),
        );
        Self::with_parts(
            &config.llm_base_url,
            &config.openrouter_api_key,
            config.llm_timeout(),
            policy,
            Arc::new(TokioSleeper),
        )
    }

    /// Build a client with an explicit retry policy and sleeper.
    pub fn with_parts(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .user_agent("echo-study/llm")
            .timeout(timeout)
            .build()
            .map_err(|err| LlmError::Request(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            policy,
            sleeper,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn attempt(&self, request: &ChatRequest, attempt: u32) -> Result<String, AttemptError<LlmError>> {
        tracing::debug!(model = %request.model, attempt, "Requesting completion");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|error| AttemptError::Fatal(LlmError::Request(error.to_string())))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::RateLimited(LlmError::Status {
                status: status.as_u16(),
                body,
            }));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Completion request failed");
            return Err(AttemptError::Fatal(LlmError::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let body: CompletionResponse = response.json().await.map_err(|error| {
            AttemptError::Fatal(LlmError::InvalidResponse(format!(
                "failed to decode completion: {error}"
            )))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AttemptError::Fatal(LlmError::InvalidResponse(
                    "response contained no choices".into(),
                ))
            })
    }
}

#[async_trait]
impl ChatModel for OpenRouterClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let outcome = retry_with_backoff(&self.policy, self.sleeper.as_ref(), |attempt| {
            let request = &request;
            async move { self.attempt(request, attempt).await }
        })
        .await;

        match outcome {
            Ok(content) => Ok(content),
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::error!(attempts, error = %last, "Rate limit retries exhausted");
                Err(LlmError::RateLimited { attempts })
            }
            Err(RetryError::Fatal(error)) => Err(error),
        }
    }
}
