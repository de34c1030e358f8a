//! Ask every configured vendor the same fact-check question

use crate::config::Config;
use crate::llm::{init_client, InitError, LlmClient, RemoteServiceError, Vendor};
use crate::prompt::build_prompt;
use crate::FactCheckRequest;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FactCheckError {
    #[error("Please enter a question.")]
    EmptyClaim,

    #[error(transparent)]
    Remote(#[from] RemoteServiceError),
}

/// One vendor's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorReply {
    pub vendor: Vendor,
    pub reply: String,
}

/// Answers from every vendor, in the order they were asked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub request: FactCheckRequest,
    pub replies: Vec<VendorReply>,
}

impl Comparison {
    pub fn reply_for(&self, vendor: Vendor) -> Option<&str> {
        self.replies
            .iter()
            .find(|r| r.vendor == vendor)
            .map(|r| r.reply.as_str())
    }

    /// `{"gemini": "...", "perplexity": "..."}`
    pub fn to_vendor_map(&self) -> BTreeMap<&'static str, &str> {
        self.replies
            .iter()
            .map(|r| (r.vendor.as_str(), r.reply.as_str()))
            .collect()
    }
}

pub struct FactChecker {
    clients: Vec<Box<dyn LlmClient>>,
}

impl FactChecker {
    pub fn new(clients: Vec<Box<dyn LlmClient>>) -> Self {
        Self { clients }
    }

    /// Initialize a client for each of `vendors` from config
    pub fn from_config(config: &Config, vendors: &[Vendor]) -> Result<Self, InitError> {
        let clients = vendors
            .iter()
            .map(|&vendor| init_client(vendor, config.vendors.get(vendor)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(clients))
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        self.clients.iter().map(|c| c.vendor()).collect()
    }

    /// Query each vendor in turn. The first failing vendor fails the whole check;
    /// a vendor that stays silent contributes an empty reply.
    pub fn check(&self, request: &FactCheckRequest) -> Result<Comparison, FactCheckError> {
        if request.claim.trim().is_empty() {
            return Err(FactCheckError::EmptyClaim);
        }

        let prompt = build_prompt(&request.claim, request.constraint);
        let mut replies = Vec::with_capacity(self.clients.len());

        for client in &self.clients {
            let vendor = client.vendor();
            log::debug!("Asking {}: {}", vendor, request.claim);
            let reply = match client.send(&prompt) {
                Ok(reply) => reply.trim().to_string(),
                // only_true / only_false ask the model to say nothing
                Err(RemoteServiceError::EmptyReply { .. }) => {
                    log::debug!("{} gave no answer", vendor);
                    String::new()
                }
                Err(e) => {
                    log::error!("{} fact-check failed: {}", vendor, e);
                    return Err(e.into());
                }
            };
            replies.push(VendorReply { vendor, reply });
        }

        Ok(Comparison {
            request: request.clone(),
            replies,
        })
    }
}
