//! JSON endpoint comparing both vendors' answers.
//!
//! `POST /api/check` with `{"question": "...", "constraint": "only_true"}`
//! returns `{"gemini": "...", "sonet": "..."}` or `{"error": "..."}`.

use crate::factcheck::{Comparison, FactCheckError, FactChecker};
use crate::llm::Vendor;
use crate::{Constraint, FactCheckRequest};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct CheckBody {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub constraint: Option<String>,
}

pub fn router(checker: Arc<FactChecker>) -> Router {
    Router::new()
        .route("/api/check", post(check_handler))
        .route("/health", get(health_handler))
        .with_state(checker)
}

/// Serve until Ctrl+C. Blocks the calling thread.
pub fn serve(addr: &str, checker: FactChecker) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    // Held here so the blocking HTTP clients are dropped outside the runtime
    let checker = Arc::new(checker);
    runtime.block_on(serve_router(addr, Arc::clone(&checker)))
}

async fn serve_router(addr: &str, checker: Arc<FactChecker>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    log::info!("Listening on http://{}", addr);
    log::info!("Check endpoint: POST http://{}/api/check", addr);

    axum::serve(listener, router(checker))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await
        .context("Server error")
}

pub async fn check_handler(
    State(checker): State<Arc<FactChecker>>,
    Json(body): Json<CheckBody>,
) -> (StatusCode, Json<Value>) {
    let question = body.question.unwrap_or_default();
    if question.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Please provide a question" })),
        );
    }

    let constraint = body
        .constraint
        .as_deref()
        .map(Constraint::parse_lenient)
        .unwrap_or_default();
    let request = FactCheckRequest::new(question, constraint);

    // Vendor clients block on network I/O
    let result = tokio::task::spawn_blocking(move || checker.check(&request)).await;

    match result {
        Ok(Ok(comparison)) => (StatusCode::OK, Json(reply_body(&comparison))),
        Ok(Err(FactCheckError::EmptyClaim)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Please provide a question" })),
        ),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("An error occurred: {}", e) })),
        ),
        Err(e) => {
            log::error!("Fact-check task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "An error occurred: internal failure" })),
            )
        }
    }
}

/// Perplexity answers under `sonet`, the key existing clients of the endpoint read
fn response_key(vendor: Vendor) -> &'static str {
    match vendor {
        Vendor::Gemini => "gemini",
        Vendor::Perplexity => "sonet",
    }
}

fn reply_body(comparison: &Comparison) -> Value {
    let replies: serde_json::Map<String, Value> = comparison
        .replies
        .iter()
        .map(|r| (response_key(r.vendor).to_string(), Value::from(r.reply.as_str())))
        .collect();
    Value::Object(replies)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmClient, RemoteServiceError};

    struct EchoClient(Vendor);

    impl LlmClient for EchoClient {
        fn vendor(&self) -> Vendor {
            self.0
        }

        fn send(&self, prompt: &str) -> Result<String, RemoteServiceError> {
            if prompt.contains("Respond only with 'False'") {
                Ok("False".to_string())
            } else {
                Ok(format!("True ({})", self.0))
            }
        }
    }

    struct DownClient;

    impl LlmClient for DownClient {
        fn vendor(&self) -> Vendor {
            Vendor::Perplexity
        }

        fn send(&self, _prompt: &str) -> Result<String, RemoteServiceError> {
            Err(RemoteServiceError::Transport {
                vendor: Vendor::Perplexity,
                message: "connection refused".to_string(),
            })
        }
    }

    fn checker(clients: Vec<Box<dyn LlmClient>>) -> State<Arc<FactChecker>> {
        State(Arc::new(FactChecker::new(clients)))
    }

    fn body(question: Option<&str>, constraint: Option<&str>) -> Json<CheckBody> {
        Json(CheckBody {
            question: question.map(str::to_string),
            constraint: constraint.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_check_returns_both_replies() {
        let state = checker(vec![
            Box::new(EchoClient(Vendor::Gemini)),
            Box::new(EchoClient(Vendor::Perplexity)),
        ]);
        let (status, Json(value)) = check_handler(state, body(Some("Sky is blue"), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["gemini"], "True (gemini)");
        assert_eq!(value["sonet"], "True (perplexity)");
        assert!(value.get("perplexity").is_none());
    }

    #[tokio::test]
    async fn test_check_passes_constraint() {
        let state = checker(vec![Box::new(EchoClient(Vendor::Gemini))]);
        let (status, Json(value)) =
            check_handler(state, body(Some("2 + 2 = 5"), Some("only_false"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["gemini"], "False");
    }

    #[tokio::test]
    async fn test_missing_question_is_bad_request() {
        let state = checker(vec![Box::new(EchoClient(Vendor::Gemini))]);
        let (status, Json(value)) = check_handler(state, body(None, None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Please provide a question");
    }

    #[tokio::test]
    async fn test_vendor_failure_is_server_error() {
        let state = checker(vec![Box::new(EchoClient(Vendor::Gemini)), Box::new(DownClient)]);
        let (status, Json(value)) = check_handler(state, body(Some("Sky is blue"), None)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = value["error"].as_str().unwrap();
        assert!(error.starts_with("An error occurred:"));
        assert!(error.contains("connection refused"));
    }

    struct SilentClient;

    impl LlmClient for SilentClient {
        fn vendor(&self) -> Vendor {
            Vendor::Perplexity
        }

        fn send(&self, _prompt: &str) -> Result<String, RemoteServiceError> {
            Err(RemoteServiceError::EmptyReply {
                vendor: Vendor::Perplexity,
            })
        }
    }

    #[tokio::test]
    async fn test_silent_vendor_is_empty_answer() {
        let state = checker(vec![Box::new(EchoClient(Vendor::Gemini)), Box::new(SilentClient)]);
        let (status, Json(value)) =
            check_handler(state, body(Some("The Moon is made of cheese"), Some("only_true"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["sonet"], "");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(value) = health_handler().await;
        assert_eq!(value["status"], "ok");
    }
}
