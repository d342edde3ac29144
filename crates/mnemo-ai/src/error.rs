//! Error types for the conversation core

use thiserror::Error;

/// Conversation core error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} API error {status}: {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Bad tool arguments or a rejected profile update.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The model answered with something the core cannot use.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    pub fn store(error: anyhow::Error) -> Self {
        Self::Store(format!("{error:#}"))
    }

    pub fn retrieval(error: impl std::fmt::Display) -> Self {
        Self::Retrieval(error.to_string())
    }

    /// Whether a request that failed with this error is worth repeating.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LlmHttp { status, .. } => matches!(status, 408 | 409 | 429 | 500..=599),
            Self::Http(error) => error.is_timeout() || error.is_connect(),
            Self::Llm(message) => {
                let message = message.to_ascii_lowercase();
                ["rate limit", "timeout", "timed out", "overloaded"]
                    .iter()
                    .any(|needle| message.contains(needle))
            }
            _ => false,
        }
    }

    /// Server-provided wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::LlmHttp {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type alias for conversation core operations
pub type Result<T> = std::result::Result<T, AiError>;
