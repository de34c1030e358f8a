//! Google Gemini client (generateContent API)

use super::{
    check_status, http_client, non_empty, with_model_fallback, ClientSettings, InitError,
    LlmClient, RemoteServiceError, Vendor,
};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-pro";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct GeminiClient {
    client: reqwest::blocking::Client,
    settings: ClientSettings,
}

impl GeminiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, InitError> {
        Ok(Self {
            client: http_client(Vendor::Gemini)?,
            settings,
        })
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, RemoteServiceError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            model
        );

        log::debug!("gemini: POST {} ({} prompt chars)", url, prompt.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": [{"text": prompt}]
                    }
                ]
            }))
            .send()
            .map_err(|e| RemoteServiceError::Transport {
                vendor: Vendor::Gemini,
                message: e.to_string(),
            })?;

        let body: serde_json::Value = check_status(Vendor::Gemini, response)?
            .json()
            .map_err(|e| RemoteServiceError::InvalidResponse {
                vendor: Vendor::Gemini,
                message: e.to_string(),
            })?;

        parse_reply(body)
    }
}

impl LlmClient for GeminiClient {
    fn vendor(&self) -> Vendor {
        Vendor::Gemini
    }

    fn send(&self, prompt: &str) -> Result<String, RemoteServiceError> {
        with_model_fallback(
            Vendor::Gemini,
            &self.settings.model,
            self.settings.fallback_model.as_deref(),
            |model| self.generate(model, prompt),
        )
    }
}

/// Join the text parts of every candidate into one reply.
fn parse_reply(body: serde_json::Value) -> Result<String, RemoteServiceError> {
    let parsed: GenerateContentResponse =
        serde_json::from_value(body).map_err(|e| RemoteServiceError::InvalidResponse {
            vendor: Vendor::Gemini,
            message: e.to_string(),
        })?;

    let text = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .flat_map(|candidate| {
            candidate
                .content
                .and_then(|content| content.parts)
                .unwrap_or_default()
        })
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");

    non_empty(Vendor::Gemini, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "True. "}, {"text": "Water boils at 100C at sea level."}],
                    "role": "model"
                }
            }]
        });
        assert_eq!(
            parse_reply(body).unwrap(),
            "True. Water boils at 100C at sea level."
        );
    }

    #[test]
    fn test_parse_reply_without_candidates_is_empty() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert!(matches!(
            parse_reply(body),
            Err(RemoteServiceError::EmptyReply {
                vendor: Vendor::Gemini
            })
        ));
    }

    #[test]
    fn test_parse_reply_rejects_wrong_shape() {
        let body = json!({"candidates": "nope"});
        assert!(matches!(
            parse_reply(body),
            Err(RemoteServiceError::InvalidResponse { .. })
        ));
    }
}
