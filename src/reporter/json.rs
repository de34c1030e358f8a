//! JSON reporter for machine-readable output

use crate::factcheck::Comparison;
use crate::review::{ExtractionWarning, FileOutcome, ReviewStage, RunOutcome, RunSummary};
use serde::Serialize;
use std::path::Path;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReview<'a> {
    root: &'a Path,
    nothing_to_do: bool,
    summary: JsonSummary,
    files: Vec<JsonFile<'a>>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct JsonSummary {
    attempted: usize,
    written: usize,
    unchanged: usize,
    fallback_written: usize,
    would_write: usize,
    rejected: usize,
    failed: usize,
    skipped: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonFile<'a> {
    path: &'a Path,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<ReviewStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    warnings: &'a [ExtractionWarning],
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// `{"gemini": "...", "perplexity": "..."}` plus the claim and mode
    pub fn report_comparison(&self, comparison: &Comparison) -> String {
        let value = serde_json::json!({
            "claim": comparison.request.claim,
            "constraint": comparison.request.constraint,
            "replies": comparison.to_vendor_map(),
        });
        self.render(&value)
    }

    pub fn report_review(&self, outcome: &RunOutcome) -> String {
        let review = match outcome {
            RunOutcome::NothingToDo { root, skipped } => JsonReview {
                root,
                nothing_to_do: true,
                summary: JsonSummary {
                    skipped: *skipped,
                    ..JsonSummary::default()
                },
                files: Vec::new(),
            },
            RunOutcome::Completed(summary) => JsonReview {
                root: &summary.root,
                nothing_to_do: false,
                summary: Self::summary(summary),
                files: summary.files.iter().map(Self::file).collect(),
            },
        };
        self.render(&review)
    }

    fn summary(summary: &RunSummary) -> JsonSummary {
        JsonSummary {
            attempted: summary.attempted(),
            written: summary.written(),
            unchanged: summary.unchanged(),
            fallback_written: summary.fallback_written(),
            would_write: summary.would_write(),
            rejected: summary.rejected(),
            failed: summary.failed(),
            skipped: summary.skipped,
        }
    }

    fn file(report: &crate::review::FileReport) -> JsonFile<'_> {
        let mut file = JsonFile {
            path: &report.path,
            status: "",
            backup: None,
            fallback: None,
            changed: None,
            stage: None,
            error: None,
            warnings: &report.warnings,
        };
        match &report.outcome {
            FileOutcome::Written {
                backup,
                fallback,
                changed,
            } => {
                file.status = "written";
                file.backup = Some(backup.as_path());
                file.fallback = Some(*fallback);
                file.changed = Some(*changed);
            }
            FileOutcome::WouldWrite { fallback, changed } => {
                file.status = "would-write";
                file.fallback = Some(*fallback);
                file.changed = Some(*changed);
            }
            FileOutcome::Rejected => file.status = "rejected",
            FileOutcome::Failed(e) => {
                file.status = "failed";
                file.stage = Some(e.stage());
                file.error = Some(e.to_string());
            }
        }
        file
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}
