//! Weighted model backend configuration.

use serde::{Deserialize, Serialize};

/// One model backend in the selection universe.
///
/// Weights need not sum to one; selection probability is `weight / Σweight`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Model identifier sent to the endpoint.
    pub name: String,

    /// Base URL of an OpenAI-compatible endpoint, e.g. `https://host/v1`.
    pub api_base: String,

    /// Non-negative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Environment variable holding the bearer token.
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_weight() -> f64 {
    1.0
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, api_base: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            api_base: api_base.into(),
            weight,
            api_key_env: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the environment variable that holds the token.
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }
}
