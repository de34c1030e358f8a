//! LLM-assisted file review: walk a directory, ask the model for an edited
//! version of each eligible file, back the original up and overwrite it.

pub mod extract;
mod pipeline;

pub use extract::{
    expected_language, extract, Extraction, ExtractionFailure, ExtractionResult,
    ExtractionWarning,
};
pub use pipeline::{backup_path, FallbackPolicy, ReviewOptions, ReviewPipeline};

use crate::llm::RemoteServiceError;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file read from disk and ready to be sent for review
#[derive(Debug, Clone)]
pub struct ReviewTask {
    pub path: PathBuf,
    pub content: String,
    /// Extension including the leading dot, as it appears in the file name
    pub extension: String,
    /// Fence language expected for this extension
    pub language_hint: Option<&'static str>,
}

impl ReviewTask {
    pub fn new(path: &Path, content: String) -> Self {
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let language_hint = expected_language(&extension);
        Self {
            path: path.to_path_buf(),
            content,
            extension,
            language_hint,
        }
    }

    /// Extension without the dot, used as the tag of the prompt's code block
    pub fn extension_hint(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}

/// Per-file states. A file that stops early ends in `Failed` at the stage it
/// could not reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStage {
    Discovered,
    Read,
    Prompted,
    Replied,
    Extracted,
    BackedUp,
    Written,
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReviewStage::Discovered => "discovered",
            ReviewStage::Read => "read",
            ReviewStage::Prompted => "prompted",
            ReviewStage::Replied => "replied",
            ReviewStage::Extracted => "extracted",
            ReviewStage::BackedUp => "backed-up",
            ReviewStage::Written => "written",
        };
        f.write_str(name)
    }
}

/// Why a single file was not rewritten
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("could not read file: {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Remote(#[from] RemoteServiceError),

    #[error("could not extract content from reply: {0}")]
    Extraction(#[from] ExtractionFailure),

    #[error("could not create backup {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write file: {0}")]
    Write(#[source] io::Error),
}

impl ReviewError {
    /// The stage the file failed to reach
    pub fn stage(&self) -> ReviewStage {
        match self {
            ReviewError::Read(_) => ReviewStage::Read,
            ReviewError::Remote(_) => ReviewStage::Replied,
            ReviewError::Extraction(_) => ReviewStage::Extracted,
            ReviewError::Backup { .. } => ReviewStage::BackedUp,
            ReviewError::Write(_) => ReviewStage::Written,
        }
    }
}

/// Fatal errors that prevent a run from starting
#[derive(Debug, Error)]
pub enum RunError {
    #[error("folder '{}' not found", .0.display())]
    RootNotFound(PathBuf),
}

/// What happened to one eligible file
#[derive(Debug)]
pub enum FileOutcome {
    /// Backed up and overwritten
    Written {
        backup: PathBuf,
        fallback: bool,
        changed: bool,
    },
    /// Dry run: everything up to the backup succeeded
    WouldWrite { fallback: bool, changed: bool },
    /// Reply did not follow the fenced format and fallback writes are disabled
    Rejected,
    Failed(ReviewError),
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    pub warnings: Vec<ExtractionWarning>,
}

/// Result of walking a root with at least one eligible file
#[derive(Debug)]
pub struct RunSummary {
    pub root: PathBuf,
    pub files: Vec<FileReport>,
    /// Files outside the allow-list or matched by an ignore pattern
    pub skipped: usize,
}

impl RunSummary {
    /// Every eligible file, whatever its outcome
    pub fn attempted(&self) -> usize {
        self.files.len()
    }

    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written { .. }))
    }

    /// Written files whose new content equals the original
    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written { changed: false, .. }))
    }

    pub fn fallback_written(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written { fallback: true, .. }))
    }

    pub fn would_write(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::WouldWrite { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Rejected))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Result of a review run
#[derive(Debug)]
pub enum RunOutcome {
    /// The root holds no eligible files
    NothingToDo { root: PathBuf, skipped: usize },
    Completed(RunSummary),
}
