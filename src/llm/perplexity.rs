//! Perplexity client (OpenAI-style chat completions)

use super::{
    check_status, http_client, non_empty, with_model_fallback, ClientSettings, InitError,
    LlmClient, RemoteServiceError, Vendor,
};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_MODEL: &str = "sonar-pro";
pub const DEFAULT_API_KEY_ENV: &str = "SONET_API_KEY";

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

pub struct PerplexityClient {
    client: reqwest::blocking::Client,
    settings: ClientSettings,
}

impl PerplexityClient {
    pub fn new(settings: ClientSettings) -> Result<Self, InitError> {
        Ok(Self {
            client: http_client(Vendor::Perplexity)?,
            settings,
        })
    }

    fn complete(&self, model: &str, prompt: &str) -> Result<String, RemoteServiceError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        log::debug!("perplexity: POST {} model={}", url, model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&json!({
                "model": model,
                "messages": [
                    {"role": "user", "content": prompt}
                ]
            }))
            .send()
            .map_err(|e| RemoteServiceError::Transport {
                vendor: Vendor::Perplexity,
                message: e.to_string(),
            })?;

        let body: serde_json::Value = check_status(Vendor::Perplexity, response)?
            .json()
            .map_err(|e| RemoteServiceError::InvalidResponse {
                vendor: Vendor::Perplexity,
                message: e.to_string(),
            })?;

        parse_reply(body)
    }
}

impl LlmClient for PerplexityClient {
    fn vendor(&self) -> Vendor {
        Vendor::Perplexity
    }

    fn send(&self, prompt: &str) -> Result<String, RemoteServiceError> {
        with_model_fallback(
            Vendor::Perplexity,
            &self.settings.model,
            self.settings.fallback_model.as_deref(),
            |model| self.complete(model, prompt),
        )
    }
}

fn parse_reply(body: serde_json::Value) -> Result<String, RemoteServiceError> {
    let parsed: ChatCompletionsResponse =
        serde_json::from_value(body).map_err(|e| RemoteServiceError::InvalidResponse {
            vendor: Vendor::Perplexity,
            message: e.to_string(),
        })?;

    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    non_empty(Vendor::Perplexity, text)
}
