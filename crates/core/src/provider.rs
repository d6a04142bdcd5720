//! Provider trait: the abstraction over chat-completion backends.
//!
//! A Provider takes an ordered list of role-tagged blocks and returns the
//! assistant text. One round trip per request: no streaming, no retries.

use crate::error::ProviderError;
use crate::message::Role;
use crate::settings::ApiSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One role-tagged block of an assembled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBlock {
    pub role: Role,
    pub content: String,
}

impl PromptBlock {
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

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// A complete completion request.
#[derive(Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Base URL of the OpenAI-compatible API
    pub endpoint: String,

    #[serde(default, skip_serializing)]
    pub api_key: String,

    pub model: String,

    pub messages: Vec<PromptBlock>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.8
}

impl CompletionRequest {
    pub fn new(api: &ApiSettings, messages: Vec<PromptBlock>) -> Self {
        Self {
            endpoint: api.endpoint.clone(),
            api_key: api.api_key.clone(),
            model: api.model.clone(),
            messages,
            temperature: default_temperature(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// A successful completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The assistant message text
    pub content: String,

    /// Which model actually responded
    pub model: String,

    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Send a request and get the complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// List model identifiers available at the endpoint.
    async fn list_models(
        &self,
        _api: &ApiSettings,
    ) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}
