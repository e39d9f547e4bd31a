//! Model backends: the seam to the external model-serving endpoint.
//!
//! # Modules
//!
//! - [`openai`] : `OpenAiCompatibleBackend` (chat completions over HTTP)
//! - [`retry`]  : `RetryPolicy`, `complete_with_retry()` (timeout + backoff)
//! - [`extract`]: pulling program text out of a completion

pub mod extract;
pub mod openai;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ModelConfig;

pub use extract::extract_program;
pub use openai::OpenAiCompatibleBackend;
pub use retry::{complete_with_retry, RetryExhausted, RetryPolicy};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role/content pair of a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Classified failure of a backend call. Never fatal to a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("http status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("completion contained no content")]
    EmptyCompletion,

    #[error("request cancelled")]
    Cancelled,
}

impl BackendError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BackendError::Auth(_) | BackendError::Cancelled)
    }
}

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Generates text for an ordered list of messages using one configured model.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Return the first completion's text.
    async fn complete(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
    ) -> BackendResult<String>;
}
