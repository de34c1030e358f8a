//! Vendor-neutral LLM client
//!
//! Every vendor satisfies the same contract: one prompt in, one text reply or
//! a [`RemoteServiceError`] out. Transport failures, non-2xx statuses,
//! undecodable bodies and empty replies are all folded into that one error
//! type so callers never see vendor-specific exceptions.
//!
//! Clients are created through [`init_client`], which validates configuration
//! up front (credential present, HTTP client buildable) and returns an error
//! instead of terminating the process.

pub mod gemini;
pub mod perplexity;

pub use gemini::GeminiClient;
pub use perplexity::PerplexityClient;

use crate::config::VendorConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported LLM vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Gemini,
    Perplexity,
}

impl Vendor {
    pub const ALL: [Vendor; 2] = [Vendor::Gemini, Vendor::Perplexity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Gemini => "gemini",
            Vendor::Perplexity => "perplexity",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Vendor::Gemini),
            // The Perplexity key has historically been stored as SONET_API_KEY
            "perplexity" | "sonet" | "sonar" => Ok(Vendor::Perplexity),
            other => Err(format!(
                "unknown vendor '{}' (expected one of: gemini, perplexity)",
                other
            )),
        }
    }
}

/// Failure of a single LLM call
#[derive(Debug, Error)]
pub enum RemoteServiceError {
    #[error("{vendor}: request failed: {message}")]
    Transport { vendor: Vendor, message: String },

    #[error("{vendor}: rate limited, try again later")]
    RateLimited { vendor: Vendor },

    #[error("{vendor}: API error: HTTP {status}: {body}")]
    Status {
        vendor: Vendor,
        status: u16,
        body: String,
    },

    #[error("{vendor}: invalid response: {message}")]
    InvalidResponse { vendor: Vendor, message: String },

    #[error("{vendor}: returned an empty reply")]
    EmptyReply { vendor: Vendor },
}

impl RemoteServiceError {
    pub fn vendor(&self) -> Vendor {
        match self {
            RemoteServiceError::Transport { vendor, .. }
            | RemoteServiceError::RateLimited { vendor }
            | RemoteServiceError::Status { vendor, .. }
            | RemoteServiceError::InvalidResponse { vendor, .. }
            | RemoteServiceError::EmptyReply { vendor } => *vendor,
        }
    }

    /// HTTP 404, which vendors use for an unknown model id
    pub fn is_model_not_found(&self) -> bool {
        matches!(self, RemoteServiceError::Status { status: 404, .. })
    }
}

/// Failure to construct a client
#[derive(Debug, Error)]
pub enum InitError {
    #[error("{env} environment variable not set (required for {vendor})")]
    MissingCredential { vendor: Vendor, env: String },

    #[error("{vendor}: no model configured")]
    MissingModel { vendor: Vendor },

    #[error("{vendor}: failed to build HTTP client: {message}")]
    HttpClient { vendor: Vendor, message: String },
}

/// One prompt in, one text reply out
pub trait LlmClient: Send + Sync {
    /// Vendor this client talks to
    fn vendor(&self) -> Vendor;

    /// Send a prompt and return the model's reply text.
    ///
    /// A successful return is never blank; blank replies are reported as
    /// [`RemoteServiceError::EmptyReply`].
    fn send(&self, prompt: &str) -> Result<String, RemoteServiceError>;
}

/// Validated connection settings for a vendor client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub model: String,
    pub fallback_model: Option<String>,
    pub base_url: String,
}

impl ClientSettings {
    /// Resolve settings from config, reading the credential from the environment.
    pub fn resolve(vendor: Vendor, config: &VendorConfig) -> Result<Self, InitError> {
        let env = config.api_key_env_or_default(vendor);
        let api_key = std::env::var(&env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| InitError::MissingCredential {
                vendor,
                env: env.clone(),
            })?;

        let model = config.model_or_default(vendor);
        if model.trim().is_empty() {
            return Err(InitError::MissingModel { vendor });
        }

        Ok(Self {
            api_key,
            model,
            fallback_model: config.fallback_model_or_default(vendor),
            base_url: config.base_url_or_default(vendor),
        })
    }
}

/// Create the client for a vendor.
pub fn init_client(vendor: Vendor, config: &VendorConfig) -> Result<Box<dyn LlmClient>, InitError> {
    let settings = ClientSettings::resolve(vendor, config)?;
    let client: Box<dyn LlmClient> = match vendor {
        Vendor::Gemini => Box::new(GeminiClient::new(settings)?),
        Vendor::Perplexity => Box::new(PerplexityClient::new(settings)?),
    };
    log::debug!("Initialized {} client", vendor);
    Ok(client)
}

pub(crate) fn http_client(vendor: Vendor) -> Result<reqwest::blocking::Client, InitError> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("factcheck/", env!("CARGO_PKG_VERSION")))
        // No request timeout: an unresponsive vendor stalls the caller
        .timeout(None::<std::time::Duration>)
        .build()
        .map_err(|e| InitError::HttpClient {
            vendor,
            message: e.to_string(),
        })
}

/// Map a non-success HTTP response to an error, passing successes through.
pub(crate) fn check_status(
    vendor: Vendor,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, RemoteServiceError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(RemoteServiceError::RateLimited { vendor });
    }

    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(RemoteServiceError::Status {
            vendor,
            status: status.as_u16(),
            body: truncate_text(&body, 300),
        });
    }

    Ok(response)
}

/// Run `call` with the primary model, repeating once with the fallback model
/// if the primary is reported as not found.
pub(crate) fn with_model_fallback<F>(
    vendor: Vendor,
    model: &str,
    fallback_model: Option<&str>,
    call: F,
) -> Result<String, RemoteServiceError>
where
    F: Fn(&str) -> Result<String, RemoteServiceError>,
{
    match call(model) {
        Err(e) if e.is_model_not_found() => match fallback_model {
            Some(fallback) if fallback != model => {
                log::warn!(
                    "{}: model '{}' unavailable ({}); using '{}'",
                    vendor,
                    model,
                    e,
                    fallback
                );
                call(fallback)
            }
            _ => Err(e),
        },
        other => other,
    }
}

pub(crate) fn non_empty(vendor: Vendor, text: String) -> Result<String, RemoteServiceError> {
    if text.trim().is_empty() {
        Err(RemoteServiceError::EmptyReply { vendor })
    } else {
        Ok(text)
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
