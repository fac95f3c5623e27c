use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6333";
const DEFAULT_INDEX_NAME: &str = "echo-chat-index";
const DEFAULT_NAMESPACE: &str = "pdf-namespace";
const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_CHAT_MODEL: &str = "mistralai/mistral-small-3.1-24b-instruct:free";
const DEFAULT_STUDY_MODEL: &str = "google/gemini-2.5-pro-exp-03-25:free";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration shared by every binary in the crate.
///
/// Loaded once in `main` and handed to constructors explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key for the OpenRouter chat-completions endpoint.
    pub openrouter_api_key: String,
    /// Base URL of the OpenAI-compatible chat-completions API.
    pub llm_base_url: String,
    /// Model used to answer retrieval-augmented queries.
    pub chat_model: String,
    /// Model used for note summarization and flashcard generation.
    pub study_model: String,
    /// Network timeout applied to each individual upstream attempt.
    pub llm_timeout_secs: u64,
    /// Total attempts made when the upstream rate limits us.
    pub llm_max_attempts: u32,
    /// Initial backoff delay in milliseconds, doubled after every rate-limited attempt.
    pub llm_backoff_base_ms: u64,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// API key required to access Qdrant.
    pub qdrant_api_key: String,
    /// Name of the collection holding the indexed chunks.
    pub index_name: String,
    /// Namespace stamped on every record and used to scope searches.
    pub index_namespace: String,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime serving embeddings.
    pub ollama_url: String,
    /// Number of nearest neighbours retrieved per query.
    pub retrieval_top_k: usize,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic in-process hashing embedder for offline use.
    Hashing,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(Requirements::Index, |key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// `OPENROUTER_API_KEY` is always required; `QDRANT_API_KEY` only for [`Requirements::Index`].
    pub fn from_lookup<F>(requirements: Requirements, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        Ok(Self {
            openrouter_api_key: vars.required("OPENROUTER_API_KEY")?,
            llm_base_url: vars.or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            chat_model: vars.or("CHAT_MODEL", DEFAULT_CHAT_MODEL),
            study_model: vars.or("STUDY_MODEL", DEFAULT_STUDY_MODEL),
            llm_timeout_secs: vars.parse_or("LLM_TIMEOUT_SECS", 10)?,
            llm_max_attempts: vars.parse_or("LLM_MAX_ATTEMPTS", 5)?,
            llm_backoff_base_ms: vars.parse_or("LLM_BACKOFF_BASE_MS", 2000)?,
            qdrant_url: vars.or("QDRANT_URL", DEFAULT_QDRANT_URL),
            qdrant_api_key: match requirements {
                Requirements::Index => vars.required("QDRANT_API_KEY")?,
                Requirements::LanguageModel => vars.or("QDRANT_API_KEY", ""),
            },
            index_name: vars.or("INDEX_NAME", DEFAULT_INDEX_NAME),
            index_namespace: vars.or("INDEX_NAMESPACE", DEFAULT_NAMESPACE),
            embedding_provider: vars
                .optional("EMBEDDING_PROVIDER")
                .map(|value| {
                    value.parse().map_err(|()| {
                        ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(EmbeddingProvider::Ollama),
            embedding_model: vars.or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimension: vars.parse_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            ollama_url: vars.or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            retrieval_top_k: vars.parse_or("RETRIEVAL_TOP_K", 3)?,
            chunk_size: vars.parse_or("CHUNK_SIZE", 1000)?,
            chunk_overlap: vars.parse_or("CHUNK_OVERLAP", 200)?,
            server_port: vars
                .optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Read `.env` (when present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Like [`Config::load`] for services that only talk to the language model.
    pub fn load_for_study() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(Requirements::LanguageModel, |key| env::var(key).ok())
    }

    /// Log the effective settings, secrets excluded. Call once tracing is installed.
    pub fn log_summary(&self) {
        tracing::debug!(
            qdrant_url = %self.qdrant_url,
            index = %self.index_name,
            namespace = %self.index_namespace,
            embedding_provider = ?self.embedding_provider,
            embedding_model = %self.embedding_model,
            chat_model = %self.chat_model,
            study_model = %self.study_model,
            server_port = ?self.server_port,
            "Loaded configuration"
        );
    }

    /// Per-attempt network timeout for upstream model calls.
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

/// Which upstream credentials a binary cannot start without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirements {
    /// Language model and vector index.
    Index,
    /// Language model only.
    LanguageModel,
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}
