//! factcheck: query two LLM vendors about a claim and review files with an LLM
//!
//! The library exposes the building blocks used by the `factcheck` binary:
//! prompt construction, a vendor-neutral [`llm::LlmClient`], the fenced
//! code-block extractor, the file rewrite pipeline, and the JSON endpoint.

pub mod config;
pub mod factcheck;
pub mod llm;
pub mod prompt;
pub mod reporter;
pub mod review;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the model is allowed to answer a fact-check question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Reply "True" only when the claim is factual, otherwise nothing
    OnlyTrue,
    /// Reply "False" only when the claim is not factual, otherwise nothing
    OnlyFalse,
    /// Leading "True"/"False" plus a reason of at most 15 words
    #[default]
    VerdictAndShortReason,
}

impl Constraint {
    /// Parse a constraint name. Unknown names select the default template.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "only_true" => Constraint::OnlyTrue,
            "only_false" => Constraint::OnlyFalse,
            _ => Constraint::VerdictAndShortReason,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Constraint::OnlyTrue => "only_true",
            Constraint::OnlyFalse => "only_false",
            Constraint::VerdictAndShortReason => "verdict_and_short_reason",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Constraint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Constraint::parse_lenient(s))
    }
}

/// A single fact-check question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactCheckRequest {
    /// The statement to be checked
    pub claim: String,
    /// Answer format the model must follow
    #[serde(default)]
    pub constraint: Constraint,
}

impl FactCheckRequest {
    pub fn new(claim: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            claim: claim.into(),
            constraint,
        }
    }
}
