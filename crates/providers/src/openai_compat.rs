//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, DeepSeek, Ollama, vLLM and any endpoint
//! exposing `/chat/completions` and `/models`. The endpoint and key come
//! with each request because the user can change them at any time in
//! settings.

use async_trait::async_trait;
use pocketline_core::error::ProviderError;
use pocketline_core::message::Role;
use pocketline_core::provider::*;
use pocketline_core::settings::ApiSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An OpenAI-compatible chat-completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider whose HTTP client gives up after `timeout`.
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            client,
        }
    }

    fn url(endpoint: &str, path: &str) -> String {
        format!("{}/{}", endpoint.trim_end_matches('/'), path)
    }

    /// Convert prompt blocks to OpenAI API format.
    fn to_api_messages(blocks: &[PromptBlock]) -> Vec<ApiMessage> {
        blocks
            .iter()
            .map(|b| ApiMessage {
                role: match b.role {
                    Role::User => "user".into(),
                    Role::Model => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: Some(b.content.clone()),
            })
            .collect()
    }

    fn status_error(status: u16, body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited,
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => ProviderError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }
}

impl Default for OpenAiCompatProvider {
    fn default() -> Self {
        Self::new("openai-compatible", Duration::from_secs(120))
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if request.endpoint.trim().is_empty() {
            return Err(ProviderError::NotConfigured("API endpoint is empty".into()));
        }
        let url = Self::url(&request.endpoint, "chat/completions");

        let body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            blocks = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", request.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(Self::status_error(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or(request.model),
            usage,
        })
    }

    async fn list_models(
        &self,
        api: &ApiSettings,
    ) -> std::result::Result<Vec<String>, ProviderError> {
        let url = Self::url(&api.endpoint, "models");
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", api.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, error_body));
        }

        let body: ModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(body.data.into_iter().map(|m| m.id).collect())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}
