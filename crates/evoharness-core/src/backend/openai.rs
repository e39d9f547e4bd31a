//! OpenAI-compatible chat completions client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BackendError, BackendResult, ChatMessage, ModelBackend};
use crate::domain::ModelConfig;

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Posts to `{api_base}/chat/completions` and returns the first choice.
///
/// Tokens are run-level configuration keyed by model name; a model without a
/// token is called without an `Authorization` header.
pub struct OpenAiCompatibleBackend {
    http: reqwest::Client,
    timeout_ms: u64,
    tokens: HashMap<String, String>,
}

impl OpenAiCompatibleBackend {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("evoharness/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(Self {
            http,
            timeout_ms: timeout.as_millis() as u64,
            tokens: HashMap::new(),
        })
    }

    /// Create a client and read each model's token from the variable named by
    /// its `api_key_env`. Missing variables are logged and left unset.
    pub fn from_env(models: &[ModelConfig], timeout: Duration) -> BackendResult<Self> {
        let mut backend = Self::new(timeout)?;
        for model in models {
            let Some(var) = &model.api_key_env else {
                continue;
            };
            match std::env::var(var) {
                Ok(token) => backend.tokens.insert(model.name.clone(), token),
                Err(_) => {
                    warn!(model = %model.name, env = %var, "api key variable not set");
                    None
                }
            };
        }
        Ok(backend)
    }

    /// Set the bearer token for `model_name`.
    pub fn with_token(mut self, model_name: &str, token: &str) -> Self {
        self.tokens.insert(model_name.to_string(), token.to_string());
        self
    }

    fn classify_transport(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout_ms)
        } else if err.is_decode() {
            BackendError::MalformedResponse(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

fn classify_status(status: u16, mut body: String) -> BackendError {
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    match status {
        401 | 403 => BackendError::Auth(body),
        429 => BackendError::RateLimited(body),
        _ => BackendError::Http { status, body },
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    async fn complete(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
    ) -> BackendResult<String> {
        let url = format!("{}/chat/completions", model.api_base.trim_end_matches('/'));
        let body = ChatRequest {
            model: &model.name,
            messages,
            temperature: model.temperature,
            max_tokens: model.max_tokens,
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = self.tokens.get(&model.name) {
            request = request.bearer_auth(token);
        }
        debug!(model = %model.name, url = %url, "sending completion request");

        let response = request
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(BackendError::EmptyCompletion)
    }
}
