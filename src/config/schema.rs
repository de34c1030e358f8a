//! Config schema and deserialization

use crate::llm::{gemini, perplexity, Vendor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File extensions the review pipeline will touch
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] =
    &[".py", ".md", ".txt", ".js", ".html", ".css", ".json"];

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

/// Per-vendor connection settings. Credentials are never stored here, only
/// the name of the environment variable holding them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorConfig {
    /// Model id (default: gemini-1.5-flash / sonar-pro)
    #[serde(default)]
    pub model: Option<String>,

    /// Model to use when the primary model is not found. Empty string disables.
    #[serde(default)]
    pub fallback_model: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// API base URL
    #[serde(default)]
    pub base_url: Option<String>,
}

impl VendorConfig {
    pub fn model_or_default(&self, vendor: Vendor) -> String {
        self.model.clone().unwrap_or_else(|| {
            match vendor {
                Vendor::Gemini => gemini::DEFAULT_MODEL,
                Vendor::Perplexity => perplexity::DEFAULT_MODEL,
            }
            .to_string()
        })
    }

    pub fn fallback_model_or_default(&self, vendor: Vendor) -> Option<String> {
        match &self.fallback_model {
            Some(model) if model.trim().is_empty() => None,
            Some(model) => Some(model.clone()),
            None => match vendor {
                Vendor::Gemini => Some(gemini::DEFAULT_FALLBACK_MODEL.to_string()),
                Vendor::Perplexity => None,
            },
        }
    }

    pub fn api_key_env_or_default(&self, vendor: Vendor) -> String {
        self.api_key_env.clone().unwrap_or_else(|| {
            match vendor {
                Vendor::Gemini => gemini::DEFAULT_API_KEY_ENV,
                Vendor::Perplexity => perplexity::DEFAULT_API_KEY_ENV,
            }
            .to_string()
        })
    }

    pub fn base_url_or_default(&self, vendor: Vendor) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            match vendor {
                Vendor::Gemini => gemini::DEFAULT_BASE_URL,
                Vendor::Perplexity => perplexity::DEFAULT_BASE_URL,
            }
            .to_string()
        })
    }

    /// Fill unset fields from `base`
    fn merge_from(&mut self, base: VendorConfig) {
        if self.model.is_none() {
            self.model = base.model;
        }
        if self.fallback_model.is_none() {
            self.fallback_model = base.fallback_model;
        }
        if self.api_key_env.is_none() {
            self.api_key_env = base.api_key_env;
        }
        if self.base_url.is_none() {
            self.base_url = base.base_url;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorsConfig {
    #[serde(default)]
    pub gemini: VendorConfig,

    #[serde(default)]
    pub perplexity: VendorConfig,
}

impl VendorsConfig {
    pub fn get(&self, vendor: Vendor) -> &VendorConfig {
        match vendor {
            Vendor::Gemini => &self.gemini,
            Vendor::Perplexity => &self.perplexity,
        }
    }
}

/// JSON endpoint bind address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.host.as_deref().unwrap_or(DEFAULT_HOST),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }
}

/// Root config structure for .factcheckrc.json
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default)]
    pub extends: Option<String>,

    /// Directory walked by `review` when no path is given
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Vendor used by `review` (default: gemini)
    #[serde(default)]
    pub review_vendor: Option<Vendor>,

    /// Write replies that did not follow the fenced-block format. Default: false
    #[serde(default)]
    pub fallback_writes: Option<bool>,

    /// Extensions eligible for review, with leading dot (default: .py .md .txt .js .html .css .json)
    #[serde(default)]
    pub allowed_extensions: Vec<String>,

    /// Glob patterns for files/directories to exclude from review
    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default)]
    pub vendors: VendorsConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Values given on the command line; `Some` wins over the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub review_vendor: Option<Vendor>,
    pub fallback_writes: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if cli.root.is_some() {
            self.root = cli.root;
        }
        if cli.review_vendor.is_some() {
            self.review_vendor = cli.review_vendor;
        }
        if cli.fallback_writes.is_some() {
            self.fallback_writes = cli.fallback_writes;
        }
        if cli.host.is_some() {
            self.server.host = cli.host;
        }
        if cli.port.is_some() {
            self.server.port = cli.port;
        }
        self
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        if self.extends.is_none() {
            self.extends = base.extends;
        }
        if self.root.is_none() {
            self.root = base.root;
        }
        if self.review_vendor.is_none() {
            self.review_vendor = base.review_vendor;
        }
        if self.fallback_writes.is_none() {
            self.fallback_writes = base.fallback_writes;
        }
        if self.allowed_extensions.is_empty() {
            self.allowed_extensions = base.allowed_extensions;
        }

        let mut all_ignores = base.ignore;
        all_ignores.append(&mut self.ignore);
        self.ignore = all_ignores;

        self.vendors.gemini.merge_from(base.vendors.gemini);
        self.vendors.perplexity.merge_from(base.vendors.perplexity);

        if self.server.host.is_none() {
            self.server.host = base.server.host;
        }
        if self.server.port.is_none() {
            self.server.port = base.server.port;
        }
    }

    pub fn review_vendor(&self) -> Vendor {
        self.review_vendor.unwrap_or(Vendor::Gemini)
    }

    pub fn fallback_writes(&self) -> bool {
        self.fallback_writes.unwrap_or(false)
    }

    /// Allowed extensions, lowercased and with a leading dot
    pub fn get_allowed_extensions(&self) -> Vec<String> {
        if self.allowed_extensions.is_empty() {
            DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.allowed_extensions
                .iter()
                .map(|ext| {
                    let ext = ext.trim().to_lowercase();
                    if ext.starts_with('.') {
                        ext
                    } else {
                        format!(".{}", ext)
                    }
                })
                .collect()
        }
    }
}
